//! Action space derived from the objects of an environment.
//!
//! Built in two phases: enumerate `(object, interaction)` pairs from the
//! registry, then number them after the three locomotion actions. The result
//! is immutable; a new registry means a new `ActionSpace`.

use std::{collections::HashMap, fmt};

use serde::Serialize;

use crate::{interaction::Interaction, registry::ObjectRegistry};

/// What an action index stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ActionKind {
    Left,
    Right,
    Forward,
    Interact {
        object: String,
        interaction: Interaction,
    },
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Left => f.write_str("left"),
            ActionKind::Right => f.write_str("right"),
            ActionKind::Forward => f.write_str("forward"),
            ActionKind::Interact {
                object,
                interaction,
            } => write!(f, "{object}/{interaction}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActionSpace {
    actions: Vec<ActionKind>,
    ids: HashMap<String, usize>,
}

impl ActionSpace {
    pub const LEFT: usize = 0;
    pub const RIGHT: usize = 1;
    pub const FORWARD: usize = 2;

    pub fn build(registry: &ObjectRegistry) -> Self {
        let interactions = registry.iter().flat_map(|object| {
            let object = object.borrow();
            Interaction::ALL
                .into_iter()
                .filter(|interaction| object.interactions().contains(interaction))
                .map(|interaction| ActionKind::Interact {
                    object: object.name().to_string(),
                    interaction,
                })
                .collect::<Vec<_>>()
        });
        let actions: Vec<ActionKind> = [ActionKind::Left, ActionKind::Right, ActionKind::Forward]
            .into_iter()
            .chain(interactions)
            .collect();

        let ids = actions
            .iter()
            .enumerate()
            .map(|(id, action)| (action.to_string(), id))
            .collect();
        ActionSpace { actions, ids }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&ActionKind> {
        self.actions.get(id)
    }

    /// Looks up an action by its name, e.g. `"forward"` or `"door_0/open"`.
    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ActionKind)> {
        self.actions.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ObjectSpec, object::ObjectKind};

    #[test]
    fn locomotion_comes_first() {
        let space = ActionSpace::build(&ObjectRegistry::new());
        assert_eq!(space.len(), 3);
        assert_eq!(space.get(ActionSpace::LEFT), Some(&ActionKind::Left));
        assert_eq!(space.get(ActionSpace::RIGHT), Some(&ActionKind::Right));
        assert_eq!(space.get(ActionSpace::FORWARD), Some(&ActionKind::Forward));
        assert_eq!(space.get(3), None);
    }

    #[test]
    fn one_action_per_supported_interaction() {
        let registry = ObjectRegistry::from_population(&[
            ObjectSpec::new(ObjectKind::Key, 1),
            ObjectSpec::new(ObjectKind::Door, 2),
            ObjectSpec::new(ObjectKind::Goal, 1),
        ])
        .unwrap();
        let space = ActionSpace::build(&registry);

        // key: pickup/drop, door: open/close/toggle, goal: nothing
        assert_eq!(space.len(), 3 + 2 + 3 * 2);
        let names: Vec<String> = space.iter().map(|(_, a)| a.to_string()).collect();
        assert_eq!(
            names,
            [
                "left",
                "right",
                "forward",
                "key_0/pickup",
                "key_0/drop",
                "door_0/open",
                "door_0/close",
                "door_0/toggle",
                "door_1/open",
                "door_1/close",
                "door_1/toggle",
            ]
        );
        assert_eq!(space.id_of("door_1/open"), Some(8));
        assert_eq!(space.id_of("door_2/open"), None);
    }
}
