use serde::{Deserialize, Serialize};

use crate::{
    Color, Position,
    object::{ObjectKind, ObjectRef, same_object},
};

/// Facing direction. Turning right goes clockwise: east, south, west, north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    East = 0,
    South = 1,
    West = 2,
    North = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::North,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Wraps any integer into a direction.
    pub fn from_index(index: usize) -> Direction {
        Direction::ALL[index % 4]
    }

    pub fn left(self) -> Direction {
        Direction::from_index(self as usize + 3)
    }

    pub fn right(self) -> Direction {
        Direction::from_index(self as usize + 1)
    }

    /// Unit step in grid coordinates (y grows downwards).
    pub fn vec(self) -> (isize, isize) {
        match self {
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::North => (0, -1),
        }
    }

    /// Unit step towards the agent's right-hand side.
    pub fn right_vec(self) -> (isize, isize) {
        let (dx, dy) = self.vec();
        (-dy, dx)
    }

    /// Arrow used when printing the world.
    pub fn arrow(self) -> char {
        match self {
            Direction::East => '>',
            Direction::South => 'V',
            Direction::West => '<',
            Direction::North => '^',
        }
    }
}

/// Embodied agent state: where it is, where it faces, what it holds.
#[derive(Debug, Clone)]
pub struct Agent {
    pub pos: Position,
    pub dir: Direction,
    pub carrying: Vec<ObjectRef>,
    view_size: usize,
}

impl Agent {
    /// # Panics
    ///
    /// Panics if `view_size` is even or smaller than 3.
    pub fn new(view_size: usize) -> Self {
        assert!(
            view_size >= 3 && view_size % 2 == 1,
            "view size must be odd and at least 3, got {}",
            view_size
        );
        Agent {
            pos: Position::new(0, 0),
            dir: Direction::East,
            carrying: Vec::new(),
            view_size,
        }
    }

    pub fn view_size(&self) -> usize {
        self.view_size
    }

    /// Drops everything held and faces east. Position is set again by placement.
    pub fn reset(&mut self) {
        self.dir = Direction::East;
        self.carrying.clear();
    }

    /// Cell directly ahead, or `None` if it would have a negative coordinate.
    pub fn front_pos(&self) -> Option<Position> {
        let (dx, dy) = self.dir.vec();
        self.pos.offset(dx, dy)
    }

    /// Axis-aligned viewport as `(top_x, top_y, bottom_x, bottom_y)`, bottom exclusive.
    ///
    /// Coordinates may fall outside the world near its edges.
    pub fn view_extents(&self) -> (isize, isize, isize, isize) {
        let x = self.pos.x as isize;
        let y = self.pos.y as isize;
        let size = self.view_size as isize;
        let half = size / 2;
        let (top_x, top_y) = match self.dir {
            Direction::East => (x, y - half),
            Direction::South => (x - half, y),
            Direction::West => (x - size + 1, y - half),
            Direction::North => (x - half, y - size + 1),
        };
        (top_x, top_y, top_x + size, top_y + size)
    }

    /// Maps a world cell to its coordinates in the agent's rotated viewport.
    ///
    /// The agent sits at `(view_size / 2, view_size - 1)` and looks towards row 0.
    pub fn relative_coords(&self, x: usize, y: usize) -> Option<(usize, usize)> {
        let (dx, dy) = self.dir.vec();
        let (rx, ry) = self.dir.right_vec();
        let size = self.view_size as isize;
        let half = size / 2;

        let top_x = self.pos.x as isize + dx * (size - 1) - rx * half;
        let top_y = self.pos.y as isize + dy * (size - 1) - ry * half;
        let lx = x as isize - top_x;
        let ly = y as isize - top_y;

        let vx = rx * lx + ry * ly;
        let vy = -(dx * lx + dy * ly);
        if vx < 0 || vy < 0 || vx >= size || vy >= size {
            return None;
        }
        Some((vx as usize, vy as usize))
    }

    /// Inverse of [`Agent::relative_coords`]; `None` when the cell would be off the top or left edge.
    pub fn world_coords(&self, vx: usize, vy: usize) -> Option<Position> {
        let (dx, dy) = self.dir.vec();
        let (rx, ry) = self.dir.right_vec();
        let size = self.view_size as isize;
        let half = size / 2;
        let (vx, vy) = (vx as isize, vy as isize);

        let x = self.pos.x as isize + dx * (size - 1 - vy) + rx * (vx - half);
        let y = self.pos.y as isize + dy * (size - 1 - vy) + ry * (vx - half);
        if x < 0 || y < 0 {
            return None;
        }
        Some(Position::new(x as usize, y as usize))
    }

    pub fn in_view(&self, x: usize, y: usize) -> bool {
        self.relative_coords(x, y).is_some()
    }

    pub fn is_carrying(&self, object: &ObjectRef) -> bool {
        self.carrying.iter().any(|held| same_object(held, object))
    }

    /// Whether a key of `color` is among the carried objects.
    pub fn has_key(&self, color: Color) -> bool {
        self.carrying.iter().any(|held| {
            let held = held.borrow();
            held.kind() == ObjectKind::Key && held.color() == color
        })
    }

    /// Removes `object` from the carried list. Returns `false` if it was not held.
    pub fn release(&mut self, object: &ObjectRef) -> bool {
        match self.carrying.iter().position(|held| same_object(held, object)) {
            Some(index) => {
                self.carrying.remove(index);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Ball, Key, shared};

    fn agent_at(x: usize, y: usize, dir: Direction, view_size: usize) -> Agent {
        let mut agent = Agent::new(view_size);
        agent.pos = Position::new(x, y);
        agent.dir = dir;
        agent
    }

    #[test]
    fn rotation_wraps_clockwise() {
        assert_eq!(Direction::East.right(), Direction::South);
        assert_eq!(Direction::North.right(), Direction::East);
        assert_eq!(Direction::East.left(), Direction::North);
        assert_eq!(Direction::South.left(), Direction::East);
        assert_eq!(Direction::from_index(7), Direction::North);
    }

    #[test]
    #[should_panic(expected = "view size")]
    fn even_view_size_is_rejected() {
        let _ = Agent::new(4);
    }

    #[test]
    fn front_pos_follows_direction() {
        let agent = agent_at(2, 2, Direction::West, 3);
        assert_eq!(agent.front_pos(), Some(Position::new(1, 2)));
        let agent = agent_at(0, 0, Direction::North, 3);
        assert_eq!(agent.front_pos(), None);
    }

    #[test]
    fn view_extents_per_direction() {
        assert_eq!(agent_at(5, 5, Direction::East, 3).view_extents(), (5, 4, 8, 7));
        assert_eq!(agent_at(5, 5, Direction::South, 3).view_extents(), (4, 5, 7, 8));
        assert_eq!(agent_at(5, 5, Direction::West, 3).view_extents(), (3, 4, 6, 7));
        assert_eq!(agent_at(5, 5, Direction::North, 3).view_extents(), (4, 3, 7, 6));
    }

    #[test]
    fn agent_sits_at_bottom_center_of_its_view() {
        for dir in Direction::ALL {
            let agent = agent_at(4, 4, dir, 5);
            assert_eq!(agent.relative_coords(4, 4), Some((2, 4)), "{dir:?}");
            let (fx, fy) = dir.vec();
            let front = (4 + fx) as usize;
            let front_y = (4 + fy) as usize;
            assert_eq!(agent.relative_coords(front, front_y), Some((2, 3)), "{dir:?}");
            let (rx, ry) = dir.right_vec();
            let right = ((4 + rx) as usize, (4 + ry) as usize);
            assert_eq!(agent.relative_coords(right.0, right.1), Some((3, 4)), "{dir:?}");
        }
    }

    #[test]
    fn world_coords_inverts_relative_coords() {
        for dir in Direction::ALL {
            let agent = agent_at(6, 6, dir, 5);
            for vx in 0..5 {
                for vy in 0..5 {
                    let world = agent.world_coords(vx, vy).unwrap();
                    assert_eq!(agent.relative_coords(world.x, world.y), Some((vx, vy)));
                }
            }
        }
        assert!(!agent_at(6, 6, Direction::East, 5).in_view(5, 6));
    }

    #[test]
    fn carried_objects_are_tracked_by_identity() {
        let mut agent = Agent::new(3);
        let key = shared(Key::new(Color::Blue, "key_0"));
        let ball = shared(Ball::new(Color::Blue, "ball_0"));
        agent.carrying.push(key.clone());
        assert!(agent.is_carrying(&key));
        assert!(!agent.is_carrying(&ball));
        assert!(agent.has_key(Color::Blue));
        assert!(!agent.has_key(Color::Red));
        assert!(agent.release(&key));
        assert!(!agent.release(&key));
    }
}
