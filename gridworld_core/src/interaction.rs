use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{environment::World, object::ObjectRef};

/// Object interactions, in the order they are enumerated into the action space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interaction {
    Pickup,
    Drop,
    Open,
    Close,
    Toggle,
}

impl Interaction {
    pub const ALL: [Interaction; 5] = [
        Interaction::Pickup,
        Interaction::Drop,
        Interaction::Open,
        Interaction::Close,
        Interaction::Toggle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Interaction::Pickup => "pickup",
            Interaction::Drop => "drop",
            Interaction::Open => "open",
            Interaction::Close => "close",
            Interaction::Toggle => "toggle",
        }
    }

    pub fn from_name(name: &str) -> Option<Interaction> {
        Interaction::ALL
            .into_iter()
            .find(|interaction| interaction.name() == name)
    }

    /// Whether `object` supports this interaction at all.
    pub fn supported_by(self, object: &ObjectRef) -> bool {
        object.borrow().interactions().contains(&self)
    }

    /// Precondition against the current world state.
    ///
    /// Everything except `drop` needs the object in the cell in front of the
    /// agent; `drop` needs it carried and a free cell in front.
    pub fn can(self, world: &World, object: &ObjectRef) -> bool {
        if !self.supported_by(object) {
            return false;
        }
        let front = world.front_cell();
        let in_front = front.is_some_and(|cell| cell.contains(object));
        let target = object.borrow();
        let key_fits = !target.is_locked() || world.agent.has_key(target.color());

        match self {
            Interaction::Pickup => {
                target.can_pickup() && in_front && !world.agent.is_carrying(object)
            }
            Interaction::Drop => {
                world.agent.is_carrying(object) && front.is_some_and(|cell| cell.can_overlap())
            }
            Interaction::Open => in_front && !target.is_open() && key_fits,
            Interaction::Close => in_front && target.is_open(),
            Interaction::Toggle => in_front && key_fits,
        }
    }

    /// Effect. Callers check [`Interaction::can`] first.
    pub fn apply(self, world: &mut World, object: &ObjectRef) {
        match self {
            Interaction::Pickup => {
                if let Some(front) = world.agent.front_pos() {
                    world.grid.remove(front.x, front.y, object);
                }
                world.agent.carrying.push(object.clone());
            }
            Interaction::Drop => {
                if world.agent.release(object) {
                    if let Some(front) = world.agent.front_pos() {
                        world.grid.set(front.x, front.y, object.clone());
                    }
                }
            }
            Interaction::Open | Interaction::Close | Interaction::Toggle => {}
        }
        object.borrow_mut().apply(self);
    }
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
