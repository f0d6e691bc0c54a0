use std::fmt;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::{
    Color, Position,
    actions::{ActionKind, ActionSpace},
    agent::{Agent, Direction},
    cell::CellContents,
    config::{ConfigError, EnvConfig},
    encoding::DecodeError,
    object::{ObjectKind, ObjectRef},
    object_grid::{ObjectGrid, VisibilityMask},
    observation::Observation,
    registry::{ObjectRegistry, RegistryError},
    scenario::MapError,
};

/// Represents errors that abort an environment call.
///
/// Blocked moves and refused interactions are not errors; they come back as
/// a normal step with `action_done == false`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnvError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("action {action} is out of range for {num_actions} actions")]
    InvalidAction { action: usize, num_actions: usize },
    #[error("environments must define a non-empty mission string")]
    MissingMission,
    #[error("no object named '{0}' in this environment")]
    UnknownObject(String),
    #[error("the cell in front of the agent at ({}, {}) facing {dir:?} is outside the grid", .pos.x, .pos.y)]
    FrontOutOfBounds { pos: Position, dir: Direction },
    #[error("rejection sampling failed after {0} attempts")]
    PlacementExhausted(usize),
    #[error("scenario initial conditions are not satisfied")]
    InitConditions,
    #[error("agent start cell ({}, {}) cannot be overlapped", .0.x, .0.y)]
    AgentBlocked(Position),
}

/// Mutable world state shared by the engine and the scenario hooks.
#[derive(Debug)]
pub struct World {
    pub grid: ObjectGrid,
    pub agent: Agent,
    pub objects: ObjectRegistry,
    pub rng: StdRng,
    pub step_count: u64,
    pub max_steps: u64,
    max_placement_tries: usize,
    /// Cleared while a new layout is generated so placement ignores the stale agent cell.
    agent_placed: bool,
}

/// Candidate filter for placement: return `true` to reject a cell.
pub type RejectFn<'a> = &'a dyn Fn(&World, Position) -> bool;

impl World {
    pub fn new(config: &EnvConfig, objects: ObjectRegistry) -> Self {
        World {
            grid: ObjectGrid::empty(config.width, config.height),
            agent: Agent::new(config.view_size),
            objects,
            rng: StdRng::seed_from_u64(config.seed),
            step_count: 0,
            max_steps: config.max_steps,
            max_placement_tries: config.max_placement_tries,
            agent_placed: false,
        }
    }

    pub fn steps_remaining(&self) -> u64 {
        self.max_steps.saturating_sub(self.step_count)
    }

    /// Contents of the cell ahead of the agent, `None` if it is outside the grid.
    pub fn front_cell(&self) -> Option<&CellContents> {
        let front = self.agent.front_pos()?;
        self.grid.get(front.x, front.y)
    }

    /// Random integer in `[low, high)`.
    pub fn rand_int(&mut self, low: usize, high: usize) -> usize {
        self.rng.random_range(low..high)
    }

    /// Random float in `[low, high)`.
    pub fn rand_float(&mut self, low: f64, high: f64) -> f64 {
        self.rng.random_range(low..high)
    }

    pub fn rand_bool(&mut self) -> bool {
        self.rng.random_bool(0.5)
    }

    pub fn rand_elem<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.rand_int(0, items.len());
        items.get(index)
    }

    /// Distinct elements drawn without replacement, in draw order.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the number of items.
    pub fn rand_subset<T: Clone>(&mut self, items: &[T], count: usize) -> Vec<T> {
        assert!(count <= items.len(), "cannot draw {} of {}", count, items.len());
        let mut pool = items.to_vec();
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            let index = self.rand_int(0, pool.len());
            out.push(pool.remove(index));
        }
        out
    }

    pub fn rand_color(&mut self) -> Color {
        Color::ALL[self.rand_int(0, Color::ALL.len())]
    }

    pub fn rand_pos(&mut self, x_low: usize, x_high: usize, y_low: usize, y_high: usize) -> Position {
        Position::new(self.rand_int(x_low, x_high), self.rand_int(y_low, y_high))
    }

    /// Rejection-samples an empty cell inside the `top`/`size` rectangle
    /// (whole grid by default).
    fn sample_free_cell(
        &mut self,
        top: Option<Position>,
        size: Option<(usize, usize)>,
        reject: Option<RejectFn<'_>>,
        avoid_agent: bool,
    ) -> Result<Position, EnvError> {
        let top = top.unwrap_or(Position::new(0, 0));
        let (width, height) = size.unwrap_or((self.grid.width(), self.grid.height()));
        let x_high = (top.x + width).min(self.grid.width());
        let y_high = (top.y + height).min(self.grid.height());

        for attempt in 0..self.max_placement_tries {
            let pos = self.rand_pos(top.x, x_high, top.y, y_high);
            if !self.grid[pos].is_empty() {
                continue;
            }
            if avoid_agent && self.agent_placed && pos == self.agent.pos {
                continue;
            }
            if reject.is_some_and(|reject| reject(self, pos)) {
                continue;
            }
            debug!(x = pos.x, y = pos.y, attempt, "placement accepted");
            return Ok(pos);
        }
        warn!(tries = self.max_placement_tries, "placement rejection sampling exhausted");
        Err(EnvError::PlacementExhausted(self.max_placement_tries))
    }

    /// Places `object` on a random empty cell that is not the agent's.
    pub fn place_obj(
        &mut self,
        object: ObjectRef,
        top: Option<Position>,
        size: Option<(usize, usize)>,
        reject: Option<RejectFn<'_>>,
    ) -> Result<Position, EnvError> {
        let pos = self.sample_free_cell(top, size, reject, true)?;
        self.grid.set(pos.x, pos.y, object);
        Ok(pos)
    }

    /// Puts `object` at a fixed cell.
    pub fn put_obj(&mut self, object: ObjectRef, x: usize, y: usize) {
        self.grid.set(x, y, object);
    }

    /// Whether `pos` touches (8-neighbourhood) any registered object lying in the grid.
    pub fn next_to_object(&self, pos: Position) -> bool {
        self.objects.iter().any(|object| {
            self.grid
                .find(object)
                .is_some_and(|at| at.x.abs_diff(pos.x) <= 1 && at.y.abs_diff(pos.y) <= 1)
        })
    }

    /// Moves the agent to a random empty cell that is not next to a registered object.
    pub fn place_agent(
        &mut self,
        top: Option<Position>,
        size: Option<(usize, usize)>,
        rand_dir: bool,
    ) -> Result<Position, EnvError> {
        let pos = self.sample_free_cell(
            top,
            size,
            Some(&|world: &World, pos| world.next_to_object(pos)),
            false,
        )?;
        self.agent.pos = pos;
        self.agent_placed = true;
        if rand_dir {
            self.agent.dir = Direction::from_index(self.rand_int(0, 4));
        }
        Ok(pos)
    }
}

/// What happened during a step, handed to the scenario's reward and end hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub action: ActionKind,
    pub action_done: bool,
    pub reached_goal: bool,
}

/// Extra information returned with every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepInfo {
    /// `false` when the move was blocked or the interaction refused.
    pub action_done: bool,
    pub reached_goal: bool,
    /// The step budget ran out on this step.
    pub truncated: bool,
    pub step_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

/// Scenario-specific layout, mission, reward and termination.
pub trait Scenario {
    fn mission(&self) -> String;

    /// Objects the episode works with. Defaults to the configured populations.
    fn create_objects(&self, config: &EnvConfig) -> Result<ObjectRegistry, EnvError> {
        Ok(ObjectRegistry::from_population(&config.objects)?)
    }

    /// Populates the freshly emptied `world.grid`.
    fn gen_objs(&mut self, world: &mut World) -> Result<(), EnvError>;

    fn init_conditions(&self, _world: &World) -> bool {
        true
    }

    /// Positions the agent. Must leave it on an overlappable cell.
    fn place_agent(&mut self, world: &mut World) -> Result<Position, EnvError> {
        world.place_agent(None, None, true)
    }

    fn end_conditions(&self, world: &World, transition: &Transition) -> bool;

    fn reward(&self, world: &World, transition: &Transition) -> f64;
}

/// 2D grid world environment.
pub struct Env<S: Scenario> {
    config: EnvConfig,
    scenario: S,
    world: World,
    actions: ActionSpace,
    mission: String,
    episode: u64,
}

impl<S: Scenario> Env<S> {
    /// Validates the configuration, builds the action space and starts the first episode.
    pub fn new(config: EnvConfig, scenario: S) -> Result<Self, EnvError> {
        config.validate()?;
        let mission = scenario.mission();
        if mission.trim().is_empty() {
            return Err(EnvError::MissingMission);
        }
        let objects = scenario.create_objects(&config)?;
        let actions = ActionSpace::build(&objects);
        let world = World::new(&config, objects);

        let mut env = Env {
            config,
            scenario,
            world,
            actions,
            mission,
            episode: 0,
        };
        env.reset()?;
        Ok(env)
    }

    /// Starts a new episode and returns its first observation.
    pub fn reset(&mut self) -> Result<Observation, EnvError> {
        self.world.agent.reset();
        self.world.objects.reset_all();
        self.world.grid = ObjectGrid::empty(self.config.width, self.config.height);
        self.world.step_count = 0;
        self.world.agent_placed = false;

        self.scenario.gen_objs(&mut self.world)?;
        if !self.scenario.init_conditions(&self.world) {
            return Err(EnvError::InitConditions);
        }
        let start = self.scenario.place_agent(&mut self.world)?;
        let start_ok = self
            .world
            .grid
            .get(start.x, start.y)
            .is_some_and(|cell| cell.can_overlap());
        if !start_ok {
            return Err(EnvError::AgentBlocked(start));
        }
        self.world.agent_placed = true;

        self.episode += 1;
        info!(
            episode = self.episode,
            x = start.x,
            y = start.y,
            dir = self.world.agent.dir.index(),
            "episode reset"
        );
        self.gen_obs()
    }

    /// Reseeds the world's random source. Takes effect from the next reset.
    pub fn seed(&mut self, seed: u64) -> u64 {
        self.world.rng = StdRng::seed_from_u64(seed);
        seed
    }

    /// Applies one action.
    pub fn step(&mut self, action: usize) -> Result<StepOutcome, EnvError> {
        let kind = self
            .actions
            .get(action)
            .cloned()
            .ok_or(EnvError::InvalidAction {
                action,
                num_actions: self.actions.len(),
            })?;

        let mut action_done = true;
        let mut reached_goal = false;
        match &kind {
            ActionKind::Left => self.world.agent.dir = self.world.agent.dir.left(),
            ActionKind::Right => self.world.agent.dir = self.world.agent.dir.right(),
            ActionKind::Forward => {
                let agent = &self.world.agent;
                let front = agent
                    .front_pos()
                    .filter(|front| self.world.grid.is_valid(front.x, front.y))
                    .ok_or(EnvError::FrontOutOfBounds {
                        pos: agent.pos,
                        dir: agent.dir,
                    })?;
                let cell = &self.world.grid[front];
                if cell.can_overlap() {
                    reached_goal = cell.contains_kind(ObjectKind::Goal);
                    self.world.agent.pos = front;
                } else {
                    action_done = false;
                }
            }
            ActionKind::Interact {
                object,
                interaction,
            } => {
                let target = self
                    .world
                    .objects
                    .get(object)
                    .cloned()
                    .ok_or_else(|| EnvError::UnknownObject(object.clone()))?;
                if interaction.can(&self.world, &target) {
                    interaction.apply(&mut self.world, &target);
                } else {
                    action_done = false;
                }
            }
        }
        self.world.step_count += 1;

        let transition = Transition {
            action: kind,
            action_done,
            reached_goal,
        };
        let truncated = self.world.step_count >= self.world.max_steps;
        let reward = self.scenario.reward(&self.world, &transition);
        let done =
            reached_goal || truncated || self.scenario.end_conditions(&self.world, &transition);
        let observation = self.gen_obs()?;

        debug!(
            step = self.world.step_count,
            action = %transition.action,
            action_done,
            reward,
            done,
            "step"
        );
        if done {
            info!(
                episode = self.episode,
                steps = self.world.step_count,
                reached_goal,
                truncated,
                "episode finished"
            );
        }

        Ok(StepOutcome {
            observation,
            reward,
            done,
            info: StepInfo {
                action_done,
                reached_goal,
                truncated,
                step_count: self.world.step_count,
            },
        })
    }

    /// Replaces the object population and rebuilds the action space.
    ///
    /// The grid is left alone; call [`Env::reset`] to lay out the new objects.
    pub fn set_objects(&mut self, objects: ObjectRegistry) {
        self.actions = ActionSpace::build(&objects);
        self.world.objects = objects;
    }

    /// Short hex digest of the full encoded grid plus agent position and direction.
    pub fn fingerprint(&self, size: usize) -> String {
        let encoded = self.world.grid.encode(None);
        let mut hasher = Sha256::new();
        hasher.update((encoded.width() as u64).to_le_bytes());
        hasher.update((encoded.height() as u64).to_le_bytes());
        hasher.update(encoded.as_bytes());
        hasher.update((self.world.agent.pos.x as u64).to_le_bytes());
        hasher.update((self.world.agent.pos.y as u64).to_le_bytes());
        hasher.update([self.world.agent.dir.index()]);
        let digest = hex::encode(hasher.finalize());
        digest[..size.min(digest.len())].to_string()
    }

    /// Whether the occupant of a non-empty world cell shows up in the agent's observation.
    pub fn agent_sees(&self, x: usize, y: usize) -> bool {
        let Some((vx, vy)) = self.world.agent.relative_coords(x, y) else {
            return false;
        };
        let Some(world_cell) = self.world.grid.get(x, y) else {
            return false;
        };
        let Some(seen) = world_cell.objects().first() else {
            return false;
        };
        let (view, mask) = self.gen_obs_grid();
        mask[(vx, vy)] && view[(vx, vy)].contains_kind(seen.borrow().kind())
    }

    /// World-space mask of the cells the agent currently sees.
    pub fn highlight_mask(&self) -> VisibilityMask {
        let (_, visible) = self.gen_obs_grid();
        let mut highlight = VisibilityMask::new(self.world.grid.width(), self.world.grid.height());
        for ((vx, vy), seen) in visible.enumerate() {
            if !*seen {
                continue;
            }
            if let Some(pos) = self.world.agent.world_coords(vx, vy) {
                if highlight.is_valid(pos.x, pos.y) {
                    highlight[pos] = true;
                }
            }
        }
        highlight
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn scenario(&self) -> &S {
        &self.scenario
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn grid(&self) -> &ObjectGrid {
        &self.world.grid
    }

    pub fn agent(&self) -> &Agent {
        &self.world.agent
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.actions
    }

    pub fn mission(&self) -> &str {
        &self.mission
    }

    pub fn episode(&self) -> u64 {
        self.episode
    }

    pub fn step_count(&self) -> u64 {
        self.world.step_count
    }

    pub fn steps_remaining(&self) -> u64 {
        self.world.steps_remaining()
    }
}

/// Two characters per cell: object letter and color initial.
impl<S: Scenario> fmt::Display for Env<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grid = &self.world.grid;
        let agent = &self.world.agent;
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                if agent.pos == Position::new(x, y) {
                    let arrow = agent.dir.arrow();
                    write!(f, "{arrow}{arrow}")?;
                    continue;
                }
                let Some(object) = grid[(x, y)].objects().last() else {
                    f.write_str("  ")?;
                    continue;
                };
                let object = object.borrow();
                let color = object.color().code();
                match object.kind() {
                    ObjectKind::Door if object.is_open() => f.write_str("__")?,
                    ObjectKind::Door if object.is_locked() => write!(f, "L{color}")?,
                    kind => write!(f, "{}{color}", kind_letter(kind))?,
                }
            }
            if y + 1 < grid.height() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

fn kind_letter(kind: ObjectKind) -> char {
    match kind {
        ObjectKind::Wall => 'W',
        ObjectKind::Floor => 'F',
        ObjectKind::Door => 'D',
        ObjectKind::Key => 'K',
        ObjectKind::Ball => 'A',
        ObjectKind::Container => 'B',
        ObjectKind::Goal => 'G',
        ObjectKind::Lava => 'V',
        ObjectKind::Unseen | ObjectKind::Empty | ObjectKind::Agent => '?',
    }
}
