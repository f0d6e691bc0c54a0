//! Built-in scenarios.

use crate::{
    Color, EnvConfig, Position,
    config::ConfigError,
    environment::{EnvError, Scenario, Transition, World},
    object::{Ball, Door, Goal, Key, Lava, ObjectKind, Wall, shared},
    registry::ObjectRegistry,
};

/// Reward for reaching the goal, shrinking with the steps spent.
pub fn success_reward(world: &World) -> f64 {
    1.0 - 0.9 * (world.step_count as f64 / world.max_steps as f64)
}

fn standing_on_lava(world: &World) -> bool {
    let pos = world.agent.pos;
    world
        .grid
        .get(pos.x, pos.y)
        .is_some_and(|cell| cell.contains_kind(ObjectKind::Lava))
}

fn goal_reward(world: &World, transition: &Transition) -> f64 {
    if transition.reached_goal {
        success_reward(world)
    } else {
        0.0
    }
}

/// Walled room with the goal in the bottom-right interior corner.
///
/// Configured object populations are scattered at random over the floor.
#[derive(Debug, Clone, Default)]
pub struct GoalRoom;

impl Scenario for GoalRoom {
    fn mission(&self) -> String {
        "get to the green goal square".to_string()
    }

    fn gen_objs(&mut self, world: &mut World) -> Result<(), EnvError> {
        let (width, height) = (world.grid.width(), world.grid.height());
        world.grid.wall_rect(0, 0, width, height);
        world.put_obj(shared(Goal::default()), width - 2, height - 2);

        let scattered: Vec<_> = world.objects.iter().cloned().collect();
        for object in scattered {
            world.place_obj(object, None, None, None)?;
        }
        Ok(())
    }

    fn end_conditions(&self, world: &World, _transition: &Transition) -> bool {
        standing_on_lava(world)
    }

    fn reward(&self, world: &World, transition: &Transition) -> f64 {
        goal_reward(world, transition)
    }
}

/// Room split in two by a wall. The yellow door in the wall is locked and
/// its key lies on the agent's side; the goal is on the other side.
#[derive(Debug, Clone, Default)]
pub struct DoorKey;

impl DoorKey {
    pub const KEY: &'static str = "key_0";
    pub const DOOR: &'static str = "door_0";
}

impl Scenario for DoorKey {
    fn mission(&self) -> String {
        "use the key to open the door and then get to the goal".to_string()
    }

    fn create_objects(&self, _config: &EnvConfig) -> Result<ObjectRegistry, EnvError> {
        let mut objects = ObjectRegistry::new();
        objects.insert(shared(Key::new(Color::Yellow, DoorKey::KEY)))?;
        objects.insert(shared(Door::locked(Color::Yellow, DoorKey::DOOR)))?;
        Ok(objects)
    }

    fn gen_objs(&mut self, world: &mut World) -> Result<(), EnvError> {
        let (width, height) = (world.grid.width(), world.grid.height());
        if width < 5 || height < 4 {
            return Err(ConfigError::GridTooSmall { width, height }.into());
        }
        world.grid.wall_rect(0, 0, width, height);
        world.put_obj(shared(Goal::default()), width - 2, height - 2);

        let split = world.rand_int(2, width - 2);
        world.grid.vert_wall(split, 1, Some(height - 2));
        world.place_agent(None, Some((split, height)), true)?;

        let door_y = world.rand_int(1, height - 1);
        let door = world
            .objects
            .get(DoorKey::DOOR)
            .cloned()
            .ok_or_else(|| EnvError::UnknownObject(DoorKey::DOOR.to_string()))?;
        world.grid.clear(split, door_y);
        world.put_obj(door, split, door_y);

        let key = world
            .objects
            .get(DoorKey::KEY)
            .cloned()
            .ok_or_else(|| EnvError::UnknownObject(DoorKey::KEY.to_string()))?;
        world.place_obj(key, None, Some((split, height)), None)?;
        Ok(())
    }

    /// The agent was already placed on the key's side while generating.
    fn place_agent(&mut self, world: &mut World) -> Result<Position, EnvError> {
        Ok(world.agent.pos)
    }

    fn end_conditions(&self, _world: &World, _transition: &Transition) -> bool {
        false
    }

    fn reward(&self, world: &World, transition: &Transition) -> f64 {
        goal_reward(world, transition)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("map string is empty")]
    Empty,
    #[error("inconsistent width at row {row}: expected {expected}, found {found}")]
    InconsistentWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown map code '{token}' at position ({x}, {y})")]
    UnknownToken { token: String, x: usize, y: usize },
    #[error("multiple start positions ('ST') found")]
    MultipleStarts,
    #[error("no start position ('ST') found in map")]
    NoStart,
    #[error("map is {width}x{height}, but a grid must be at least 3x3")]
    TooSmall { width: usize, height: usize },
    #[error("map is {map_width}x{map_height}, but the grid is {grid_width}x{grid_height}")]
    SizeMismatch {
        map_width: usize,
        map_height: usize,
        grid_width: usize,
        grid_height: usize,
    },
}

/// One parsed map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tile {
    Blank,
    Wall,
    Goal,
    Lava,
    Key(Color),
    Door(Color),
    Ball(Color),
}

impl Tile {
    fn parse(token: &str) -> Option<Tile> {
        match token {
            "BL" | "ST" => return Some(Tile::Blank),
            "WL" => return Some(Tile::Wall),
            "GL" => return Some(Tile::Goal),
            "LV" => return Some(Tile::Lava),
            _ => {}
        }
        let mut chars = token.chars();
        let (Some(prefix), Some(code), None) = (chars.next(), chars.next(), chars.next()) else {
            return None;
        };
        let color = Color::from_code(code)?;
        match prefix {
            'K' => Some(Tile::Key(color)),
            'D' => Some(Tile::Door(color)),
            'B' => Some(Tile::Ball(color)),
            _ => None,
        }
    }
}

/// Layout loaded from a whitespace-separated token map, one row per line.
///
/// Tokens: `WL` wall, `BL` blank, `ST` agent start (blank, facing east),
/// `GL` goal, `LV` lava, `K?` key, `D?` locked door, `B?` ball, where `?` is
/// a color code (`R`, `G`, `B`, `P`, `Y`, `E` for grey). Keys, doors and
/// balls are registered as `key_<n>`, `door_<n>` and `ball_<n>` in row-major
/// order.
#[derive(Debug, Clone)]
pub struct MapScenario {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
    start: Position,
    mission: String,
}

impl MapScenario {
    pub fn parse(map: &str) -> Result<Self, MapError> {
        let lines: Vec<&str> = map
            .trim()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if lines.is_empty() {
            return Err(MapError::Empty);
        }

        let height = lines.len();
        let width = lines[0].split_whitespace().count();
        let mut tiles = Vec::with_capacity(width * height);
        let mut start = None;

        for (y, line) in lines.iter().enumerate() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != width {
                return Err(MapError::InconsistentWidth {
                    row: y,
                    expected: width,
                    found: tokens.len(),
                });
            }
            for (x, token) in tokens.into_iter().enumerate() {
                if token == "ST" {
                    if start.is_some() {
                        return Err(MapError::MultipleStarts);
                    }
                    start = Some(Position::new(x, y));
                }
                let tile = Tile::parse(token).ok_or_else(|| MapError::UnknownToken {
                    token: token.to_string(),
                    x,
                    y,
                })?;
                tiles.push(tile);
            }
        }

        if width < 3 || height < 3 {
            return Err(MapError::TooSmall { width, height });
        }
        let start = start.ok_or(MapError::NoStart)?;

        Ok(MapScenario {
            width,
            height,
            tiles,
            start,
            mission: "reach the goal".to_string(),
        })
    }

    pub fn with_mission(mut self, mission: impl Into<String>) -> Self {
        self.mission = mission.into();
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn start(&self) -> Position {
        self.start
    }

    /// `config` resized to the map.
    pub fn configure(&self, config: EnvConfig) -> EnvConfig {
        EnvConfig {
            width: self.width,
            height: self.height,
            ..config
        }
    }

    fn tiles(&self) -> impl Iterator<Item = (Position, Tile)> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .map(|(index, tile)| (Position::new(index % self.width, index / self.width), *tile))
    }

    /// Registered name of each named tile, paired with its position, in row-major order.
    fn named_tiles(&self) -> Vec<(Position, Tile, String)> {
        let (mut keys, mut doors, mut balls) = (0, 0, 0);
        let mut named = Vec::new();
        for (pos, tile) in self.tiles() {
            let counter = match tile {
                Tile::Key(_) => &mut keys,
                Tile::Door(_) => &mut doors,
                Tile::Ball(_) => &mut balls,
                _ => continue,
            };
            let kind = match tile {
                Tile::Key(_) => ObjectKind::Key,
                Tile::Door(_) => ObjectKind::Door,
                _ => ObjectKind::Ball,
            };
            named.push((pos, tile, format!("{}_{}", kind.name(), counter)));
            *counter += 1;
        }
        named
    }
}

impl Scenario for MapScenario {
    fn mission(&self) -> String {
        self.mission.clone()
    }

    fn create_objects(&self, _config: &EnvConfig) -> Result<ObjectRegistry, EnvError> {
        let mut objects = ObjectRegistry::new();
        for (_, tile, name) in self.named_tiles() {
            let object = match tile {
                Tile::Key(color) => shared(Key::new(color, name)),
                Tile::Door(color) => shared(Door::locked(color, name)),
                Tile::Ball(color) => shared(Ball::new(color, name)),
                _ => continue,
            };
            objects.insert(object)?;
        }
        Ok(objects)
    }

    fn gen_objs(&mut self, world: &mut World) -> Result<(), EnvError> {
        if world.grid.width() != self.width || world.grid.height() != self.height {
            return Err(MapError::SizeMismatch {
                map_width: self.width,
                map_height: self.height,
                grid_width: world.grid.width(),
                grid_height: world.grid.height(),
            }
            .into());
        }

        for (pos, tile) in self.tiles() {
            match tile {
                Tile::Wall => world.put_obj(shared(Wall::default()), pos.x, pos.y),
                Tile::Goal => world.put_obj(shared(Goal::default()), pos.x, pos.y),
                Tile::Lava => world.put_obj(shared(Lava::default()), pos.x, pos.y),
                Tile::Blank | Tile::Key(_) | Tile::Door(_) | Tile::Ball(_) => {}
            }
        }
        for (pos, _, name) in self.named_tiles() {
            let object = world
                .objects
                .get(&name)
                .cloned()
                .ok_or(EnvError::UnknownObject(name))?;
            world.put_obj(object, pos.x, pos.y);
        }
        Ok(())
    }

    fn place_agent(&mut self, world: &mut World) -> Result<Position, EnvError> {
        world.agent.pos = self.start;
        Ok(self.start)
    }

    fn end_conditions(&self, world: &World, _transition: &Transition) -> bool {
        standing_on_lava(world)
    }

    fn reward(&self, world: &World, transition: &Transition) -> f64 {
        goal_reward(world, transition)
    }
}
