//! World objects and the capability surface the engine relies on.
//!
//! The engine never matches on concrete object types. Everything it needs
//! (blocking, occlusion, pickability, open/locked state, the interactions an
//! object accepts) is queried through [`WorldObject`].

use std::{cell::RefCell, fmt, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{Color, encoding::DecodeError, interaction::Interaction};

/// Shared handle to an object. The grid, the agent's carried list and the
/// object registry all hold clones of the same handle.
pub type ObjectRef = Rc<RefCell<dyn WorldObject>>;

/// Object types, with the index stored in the type channel of the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Unseen = 0,
    Empty = 1,
    Wall = 2,
    Floor = 3,
    Door = 4,
    Key = 5,
    Ball = 6,
    #[serde(rename = "box")]
    Container = 7,
    Goal = 8,
    Lava = 9,
    Agent = 10,
}

impl ObjectKind {
    const ALL: [ObjectKind; 11] = [
        ObjectKind::Unseen,
        ObjectKind::Empty,
        ObjectKind::Wall,
        ObjectKind::Floor,
        ObjectKind::Door,
        ObjectKind::Key,
        ObjectKind::Ball,
        ObjectKind::Container,
        ObjectKind::Goal,
        ObjectKind::Lava,
        ObjectKind::Agent,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<ObjectKind> {
        ObjectKind::ALL.get(index as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Unseen => "unseen",
            ObjectKind::Empty => "empty",
            ObjectKind::Wall => "wall",
            ObjectKind::Floor => "floor",
            ObjectKind::Door => "door",
            ObjectKind::Key => "key",
            ObjectKind::Ball => "ball",
            ObjectKind::Container => "box",
            ObjectKind::Goal => "goal",
            ObjectKind::Lava => "lava",
            ObjectKind::Agent => "agent",
        }
    }

    /// Color given to instances created from a population count.
    pub fn default_color(self) -> Color {
        match self {
            ObjectKind::Wall => Color::Grey,
            ObjectKind::Floor => Color::Blue,
            ObjectKind::Door | ObjectKind::Key => Color::Yellow,
            ObjectKind::Ball => Color::Blue,
            ObjectKind::Container => Color::Purple,
            ObjectKind::Goal => Color::Green,
            ObjectKind::Lava => Color::Red,
            ObjectKind::Unseen | ObjectKind::Empty | ObjectKind::Agent => Color::Red,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of the state channel for doors and containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenState {
    Open = 0,
    Closed = 1,
    Locked = 2,
}

impl OpenState {
    pub fn from_index(index: u8) -> Option<OpenState> {
        match index {
            0 => Some(OpenState::Open),
            1 => Some(OpenState::Closed),
            2 => Some(OpenState::Locked),
            _ => None,
        }
    }
}

/// Capability contract every object placed in the world implements.
pub trait WorldObject: fmt::Debug {
    fn kind(&self) -> ObjectKind;

    fn color(&self) -> Color;

    /// Instance name, unique within a registry.
    fn name(&self) -> &str;

    /// Whether the agent may stand on the object's cell.
    fn can_overlap(&self) -> bool {
        false
    }

    /// Whether the object lets the visibility sweep past it.
    fn can_see_behind(&self) -> bool {
        true
    }

    fn can_pickup(&self) -> bool {
        false
    }

    fn is_open(&self) -> bool {
        false
    }

    fn is_locked(&self) -> bool {
        false
    }

    /// Interactions this object type accepts, in action-space order.
    fn interactions(&self) -> &'static [Interaction] {
        &[]
    }

    /// Applies the object-local part of an interaction the world already admitted.
    fn apply(&mut self, _interaction: Interaction) {}

    /// Restores the state the object had when it was created.
    fn reset(&mut self) {}

    fn state(&self) -> u8 {
        0
    }

    /// `(type_idx, color_idx, state)` triple.
    fn encode(&self) -> [u8; 3] {
        [self.kind().index(), self.color().index(), self.state()]
    }
}

/// Identity comparison of two handles (the same instance, not equal state).
pub fn same_object(a: &ObjectRef, b: &ObjectRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Wraps an object in a shared handle.
pub fn shared<O: WorldObject + 'static>(object: O) -> ObjectRef {
    Rc::new(RefCell::new(object))
}

macro_rules! plain_object {
    ($ty:ident, $kind:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $ty {
            name: String,
            color: Color,
        }

        impl $ty {
            pub fn new(color: Color, name: impl Into<String>) -> Self {
                $ty {
                    name: name.into(),
                    color,
                }
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                $ty::new($kind.default_color(), $kind.name())
            }
        }
    };
}

plain_object!(Wall, ObjectKind::Wall);
plain_object!(Floor, ObjectKind::Floor);
plain_object!(Key, ObjectKind::Key);
plain_object!(Ball, ObjectKind::Ball);
plain_object!(Goal, ObjectKind::Goal);
plain_object!(Lava, ObjectKind::Lava);

impl WorldObject for Wall {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Wall
    }
    fn color(&self) -> Color {
        self.color
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn can_see_behind(&self) -> bool {
        false
    }
}

impl WorldObject for Floor {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Floor
    }
    fn color(&self) -> Color {
        self.color
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn can_overlap(&self) -> bool {
        true
    }
}

impl WorldObject for Key {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Key
    }
    fn color(&self) -> Color {
        self.color
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn can_pickup(&self) -> bool {
        true
    }
    fn interactions(&self) -> &'static [Interaction] {
        &[Interaction::Pickup, Interaction::Drop]
    }
}

impl WorldObject for Ball {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Ball
    }
    fn color(&self) -> Color {
        self.color
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn can_pickup(&self) -> bool {
        true
    }
    fn interactions(&self) -> &'static [Interaction] {
        &[Interaction::Pickup, Interaction::Drop]
    }
}

impl WorldObject for Goal {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Goal
    }
    fn color(&self) -> Color {
        self.color
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn can_overlap(&self) -> bool {
        true
    }
}

impl WorldObject for Lava {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Lava
    }
    fn color(&self) -> Color {
        self.color
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn can_overlap(&self) -> bool {
        true
    }
}

/// A door. Blocks movement and sight unless open; may be locked by a key of its color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Door {
    name: String,
    color: Color,
    open: bool,
    locked: bool,
    initially_open: bool,
    initially_locked: bool,
}

impl Door {
    pub fn new(color: Color, name: impl Into<String>) -> Self {
        Door::with_state(color, name, false, false)
    }

    pub fn locked(color: Color, name: impl Into<String>) -> Self {
        Door::with_state(color, name, false, true)
    }

    pub fn with_state(color: Color, name: impl Into<String>, open: bool, locked: bool) -> Self {
        Door {
            name: name.into(),
            color,
            open,
            locked,
            initially_open: open,
            initially_locked: locked,
        }
    }
}

impl WorldObject for Door {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Door
    }
    fn color(&self) -> Color {
        self.color
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn can_overlap(&self) -> bool {
        self.open
    }
    fn can_see_behind(&self) -> bool {
        self.open
    }
    fn is_open(&self) -> bool {
        self.open
    }
    fn is_locked(&self) -> bool {
        self.locked
    }
    fn interactions(&self) -> &'static [Interaction] {
        &[Interaction::Open, Interaction::Close, Interaction::Toggle]
    }
    fn apply(&mut self, interaction: Interaction) {
        match interaction {
            Interaction::Open => {
                self.locked = false;
                self.open = true;
            }
            Interaction::Close => self.open = false,
            Interaction::Toggle => {
                if self.locked {
                    self.locked = false;
                    self.open = true;
                } else {
                    self.open = !self.open;
                }
            }
            Interaction::Pickup | Interaction::Drop => {}
        }
    }
    fn reset(&mut self) {
        self.open = self.initially_open;
        self.locked = self.initially_locked;
    }
    fn state(&self) -> u8 {
        if self.open {
            OpenState::Open as u8
        } else if self.locked {
            OpenState::Locked as u8
        } else {
            OpenState::Closed as u8
        }
    }
}

/// The box object: can be carried, and opened or closed in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    name: String,
    color: Color,
    open: bool,
}

impl Container {
    pub fn new(color: Color, name: impl Into<String>) -> Self {
        Container {
            name: name.into(),
            color,
            open: false,
        }
    }
}

impl WorldObject for Container {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Container
    }
    fn color(&self) -> Color {
        self.color
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn can_pickup(&self) -> bool {
        true
    }
    fn is_open(&self) -> bool {
        self.open
    }
    fn interactions(&self) -> &'static [Interaction] {
        &[
            Interaction::Pickup,
            Interaction::Drop,
            Interaction::Open,
            Interaction::Close,
        ]
    }
    fn apply(&mut self, interaction: Interaction) {
        match interaction {
            Interaction::Open => self.open = true,
            Interaction::Close => self.open = false,
            Interaction::Toggle => self.open = !self.open,
            Interaction::Pickup | Interaction::Drop => {}
        }
    }
    fn reset(&mut self) {
        self.open = false;
    }
    fn state(&self) -> u8 {
        if self.open {
            OpenState::Open as u8
        } else {
            OpenState::Closed as u8
        }
    }
}

/// Builds an object of the given kind. Returns `None` for the kinds that
/// have no object behind them (`unseen`, `empty`, `agent`).
pub fn new_object(kind: ObjectKind, color: Color, name: impl Into<String>) -> Option<ObjectRef> {
    let name = name.into();
    let object = match kind {
        ObjectKind::Wall => shared(Wall::new(color, name)),
        ObjectKind::Floor => shared(Floor::new(color, name)),
        ObjectKind::Door => shared(Door::new(color, name)),
        ObjectKind::Key => shared(Key::new(color, name)),
        ObjectKind::Ball => shared(Ball::new(color, name)),
        ObjectKind::Container => shared(Container::new(color, name)),
        ObjectKind::Goal => shared(Goal::new(color, name)),
        ObjectKind::Lava => shared(Lava::new(color, name)),
        ObjectKind::Unseen | ObjectKind::Empty | ObjectKind::Agent => return None,
    };
    Some(object)
}

/// Rebuilds an object from its `(type_idx, color_idx, state)` triple.
///
/// `empty` and `unseen` decode to `None`.
pub fn decode_object(type_idx: u8, color_idx: u8, state: u8) -> Result<Option<ObjectRef>, DecodeError> {
    let kind = ObjectKind::from_index(type_idx).ok_or(DecodeError::UnknownType(type_idx))?;
    if matches!(kind, ObjectKind::Unseen | ObjectKind::Empty) {
        return Ok(None);
    }
    let color = Color::from_index(color_idx).ok_or(DecodeError::UnknownColor(color_idx))?;
    let object = match kind {
        ObjectKind::Door => {
            let state = OpenState::from_index(state).ok_or(DecodeError::UnknownState {
                kind,
                state,
            })?;
            shared(Door::with_state(
                color,
                kind.name(),
                state == OpenState::Open,
                state == OpenState::Locked,
            ))
        }
        ObjectKind::Container => {
            let mut container = Container::new(color, kind.name());
            match OpenState::from_index(state) {
                Some(OpenState::Open) => container.open = true,
                Some(OpenState::Closed) => {}
                _ => return Err(DecodeError::UnknownState { kind, state }),
            }
            shared(container)
        }
        ObjectKind::Agent => return Err(DecodeError::UnknownType(type_idx)),
        other => new_object(other, color, other.name()).ok_or(DecodeError::UnknownType(type_idx))?,
    };
    Ok(Some(object))
}
