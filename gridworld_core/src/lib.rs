use serde::{Deserialize, Serialize};

pub mod actions;
pub mod agent;
pub mod cell;
pub mod config;
pub mod encoding;
pub mod environment;
pub mod grid;
pub mod interaction;
pub mod object;
pub mod object_grid;
pub mod observation;
pub mod policy;
pub mod registry;
pub mod scenario;
pub mod visibility;

pub use actions::{ActionKind, ActionSpace};
pub use agent::{Agent, Direction};
pub use cell::CellContents;
pub use config::EnvConfig;
pub use encoding::EncodedGrid;
pub use environment::{Env, EnvError, Scenario, StepInfo, StepOutcome, Transition, World};
pub use grid::Grid;
pub use interaction::Interaction;
pub use object::{ObjectKind, ObjectRef, WorldObject};
pub use object_grid::{ObjectGrid, VisibilityMask};
pub use observation::Observation;
pub use registry::ObjectRegistry;

/// Represents a 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Offsets the position, returning `None` if either coordinate would go negative.
    pub fn offset(self, dx: isize, dy: isize) -> Option<Position> {
        Some(Position {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }
}

/// Object colors, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Blue,
    Purple,
    Yellow,
    Grey,
}

impl Color {
    pub const ALL: [Color; 6] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Purple,
        Color::Yellow,
        Color::Grey,
    ];

    /// Index stored in the color channel of the encoding.
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Color> {
        Color::ALL.get(index as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Purple => "purple",
            Color::Yellow => "yellow",
            Color::Grey => "grey",
        }
    }

    /// Single-letter code used by text maps and the `Display` of an environment.
    pub fn code(self) -> char {
        match self {
            Color::Red => 'R',
            Color::Green => 'G',
            Color::Blue => 'B',
            Color::Purple => 'P',
            Color::Yellow => 'Y',
            Color::Grey => 'E',
        }
    }

    pub fn from_code(code: char) -> Option<Color> {
        Color::ALL.into_iter().find(|color| color.code() == code)
    }
}
