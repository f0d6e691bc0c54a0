use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    Position,
    actions::ActionSpace,
    agent::Direction,
    environment::{Env, Scenario, World},
    interaction::Interaction,
    object::{ObjectKind, WorldObject},
};

/// Read-only view handed to a policy each step.
#[derive(Debug, Clone, Copy)]
pub struct PolicyView<'a> {
    pub world: &'a World,
    pub actions: &'a ActionSpace,
}

impl<S: Scenario> Env<S> {
    pub fn policy_view(&self) -> PolicyView<'_> {
        PolicyView {
            world: self.world(),
            actions: self.action_space(),
        }
    }
}

/// Chooses the next action id.
///
/// `&mut self` lets a policy keep internal state such as a random source.
pub trait Policy {
    fn act(&mut self, view: &PolicyView<'_>) -> usize;
}

/// Uniformly random actions from the whole action space.
#[derive(Debug)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn act(&mut self, view: &PolicyView<'_>) -> usize {
        self.rng.random_range(0..view.actions.len())
    }
}

/// Walks to the nearest goal with A*, picking up keys and opening doors on
/// the way. When no goal is reachable it heads for a key lying on the floor;
/// with nothing to plan for it falls back to random actions.
#[derive(Debug)]
pub struct GoalSeeker {
    rng: StdRng,
}

impl GoalSeeker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn manhattan_distance(a: Position, b: Position) -> usize {
        a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
    }

    /// Overlappable now, or a door the agent can open. Lava never is.
    fn passable(world: &World, pos: Position) -> bool {
        let cell = &world.grid[pos];
        if cell.contains_kind(ObjectKind::Lava) {
            return false;
        }
        cell.can_overlap()
            || cell.objects().iter().all(|object| {
                let object = object.borrow();
                object.kind() == ObjectKind::Door
                    && (!object.is_locked() || world.agent.has_key(object.color()))
            })
    }

    fn a_star_path(world: &World, start: Position, goal: Position) -> Option<Vec<Position>> {
        #[derive(Clone, Eq, PartialEq)]
        struct PrioritizedItem {
            priority: usize,
            position: Position,
        }

        impl Ord for PrioritizedItem {
            fn cmp(&self, other: &Self) -> Ordering {
                other.priority.cmp(&self.priority)
            }
        }

        impl PartialOrd for PrioritizedItem {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        let mut frontier = BinaryHeap::new();
        let mut came_from: HashMap<Position, Position> = HashMap::new();
        let mut cost_so_far: HashMap<Position, usize> = HashMap::new();

        frontier.push(PrioritizedItem {
            priority: 0,
            position: start,
        });
        cost_so_far.insert(start, 0);

        while let Some(PrioritizedItem {
            position: current, ..
        }) = frontier.pop()
        {
            if current == goal {
                let mut path = vec![goal];
                let mut step = goal;
                while step != start {
                    step = *came_from.get(&step)?;
                    path.push(step);
                }
                path.reverse();
                return Some(path);
            }

            let new_cost = cost_so_far.get(&current).copied().unwrap_or(usize::MAX) + 1;
            for dir in Direction::ALL {
                let (dx, dy) = dir.vec();
                let Some(neighbor) = current.offset(dx, dy) else {
                    continue;
                };
                if !world.grid.is_valid(neighbor.x, neighbor.y) {
                    continue;
                }
                if neighbor != goal && !Self::passable(world, neighbor) {
                    continue;
                }
                if cost_so_far
                    .get(&neighbor)
                    .is_none_or(|&known| new_cost < known)
                {
                    cost_so_far.insert(neighbor, new_cost);
                    frontier.push(PrioritizedItem {
                        priority: new_cost + Self::manhattan_distance(neighbor, goal),
                        position: neighbor,
                    });
                    came_from.insert(neighbor, current);
                }
            }
        }
        None
    }

    fn find_objects(world: &World, matches: impl Fn(&dyn WorldObject) -> bool) -> Vec<Position> {
        world
            .grid
            .enumerate()
            .filter(|(_, cell)| cell.objects().iter().any(|object| matches(&*object.borrow())))
            .map(|((x, y), _)| Position::new(x, y))
            .collect()
    }

    fn plan_to_nearest(world: &World, targets: &[Position]) -> Option<Vec<Position>> {
        targets
            .iter()
            .filter_map(|&target| Self::a_star_path(world, world.agent.pos, target))
            .min_by_key(Vec::len)
    }

    /// Picks up a key or opens a door right in front of the agent.
    fn interact_ahead(view: &PolicyView<'_>) -> Option<usize> {
        let world = view.world;
        let front = world.front_cell()?;
        for object in front.objects() {
            let (name, kind) = {
                let object = object.borrow();
                (object.name().to_string(), object.kind())
            };
            let interaction = match kind {
                ObjectKind::Key => Interaction::Pickup,
                ObjectKind::Door => Interaction::Open,
                _ => continue,
            };
            if interaction.can(world, object) {
                if let Some(id) = view.actions.id_of(&format!("{name}/{interaction}")) {
                    return Some(id);
                }
            }
        }
        None
    }

    /// Turns towards an adjacent cell, or moves into it when already facing it.
    fn step_towards(world: &World, next: Position) -> Option<usize> {
        let agent = &world.agent;
        let desired = Direction::ALL.into_iter().find(|dir| {
            let (dx, dy) = dir.vec();
            agent.pos.offset(dx, dy) == Some(next)
        })?;
        Some(if desired == agent.dir {
            ActionSpace::FORWARD
        } else if desired == agent.dir.right() {
            ActionSpace::RIGHT
        } else {
            ActionSpace::LEFT
        })
    }
}

impl Policy for GoalSeeker {
    fn act(&mut self, view: &PolicyView<'_>) -> usize {
        let world = view.world;
        if let Some(action) = Self::interact_ahead(view) {
            return action;
        }

        let goals = Self::find_objects(world, |object| object.kind() == ObjectKind::Goal);
        let plan = Self::plan_to_nearest(world, &goals).or_else(|| {
            let keys = Self::find_objects(world, |object| object.kind() == ObjectKind::Key);
            Self::plan_to_nearest(world, &keys)
        });

        plan.and_then(|path| path.get(1).copied())
            .and_then(|next| Self::step_towards(world, next))
            .unwrap_or_else(|| self.rng.random_range(0..view.actions.len()))
    }
}
