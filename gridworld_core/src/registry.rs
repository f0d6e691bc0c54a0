use std::collections::HashMap;

use crate::{
    config::ObjectSpec,
    object::{ObjectRef, new_object},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("object name '{0}' is already registered")]
    DuplicateName(String),
    #[error("object kind '{0}' has no instances")]
    NotInstantiable(String),
}

/// Name-keyed objects of an environment, kept in insertion order.
///
/// The order is what the action space enumerates, so it must be
/// deterministic for a given configuration.
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    objects: Vec<ObjectRef>,
    by_name: HashMap<String, usize>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        ObjectRegistry::default()
    }

    /// Instantiates every population in order, naming instances `<kind>_<n>`.
    pub fn from_population(specs: &[ObjectSpec]) -> Result<Self, RegistryError> {
        let mut registry = ObjectRegistry::new();
        for spec in specs {
            let color = spec.color.unwrap_or_else(|| spec.kind.default_color());
            for n in 0..spec.count {
                let name = format!("{}_{}", spec.kind.name(), n);
                let object = new_object(spec.kind, color, name)
                    .ok_or_else(|| RegistryError::NotInstantiable(spec.kind.name().to_string()))?;
                registry.insert(object)?;
            }
        }
        Ok(registry)
    }

    pub fn insert(&mut self, object: ObjectRef) -> Result<(), RegistryError> {
        let name = object.borrow().name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.by_name.insert(name, self.objects.len());
        self.objects.push(object);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ObjectRef> {
        self.by_name.get(name).map(|&index| &self.objects[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectRef> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Restores every object's initial state.
    pub fn reset_all(&self) {
        for object in &self.objects {
            object.borrow_mut().reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, object::ObjectKind};

    #[test]
    fn population_names_follow_kind_and_order() {
        let registry = ObjectRegistry::from_population(&[
            ObjectSpec::new(ObjectKind::Door, 2),
            ObjectSpec::new(ObjectKind::Key, 1).with_color(Color::Red),
        ])
        .unwrap();

        let names: Vec<String> = registry
            .iter()
            .map(|object| object.borrow().name().to_string())
            .collect();
        assert_eq!(names, ["door_0", "door_1", "key_0"]);
        assert_eq!(registry.get("key_0").unwrap().borrow().color(), Color::Red);
        assert!(registry.get("ball_0").is_none());
    }

    #[test]
    fn repeated_kind_collides() {
        let result = ObjectRegistry::from_population(&[
            ObjectSpec::new(ObjectKind::Ball, 1),
            ObjectSpec::new(ObjectKind::Ball, 1),
        ]);
        assert_eq!(
            result.unwrap_err(),
            RegistryError::DuplicateName("ball_0".to_string())
        );
    }
}
