use serde::{Deserialize, Serialize};

use crate::{Color, object::ObjectKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("grid must be at least 3x3, got {width}x{height}")]
    GridTooSmall { width: usize, height: usize },
    #[error("view size must be odd and at least 3, got {0}")]
    InvalidViewSize(usize),
    #[error("max_steps must be at least 1")]
    ZeroMaxSteps,
    #[error("max_placement_tries must be at least 1")]
    ZeroPlacementTries,
    #[error("object kind {0} cannot be instantiated")]
    InvalidObjectKind(ObjectKind),
}

/// How many instances of one object kind a scenario starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub kind: ObjectKind,
    pub count: usize,
    /// Overrides the kind's default color.
    #[serde(default)]
    pub color: Option<Color>,
}

impl ObjectSpec {
    pub fn new(kind: ObjectKind, count: usize) -> Self {
        ObjectSpec {
            kind,
            count,
            color: None,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// Environment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub width: usize,
    pub height: usize,
    pub max_steps: u64,
    /// Skips the occlusion sweep; every viewport cell is visible.
    pub see_through_walls: bool,
    pub seed: u64,
    pub view_size: usize,
    /// Attempts allowed to the rejection sampler before placement fails.
    pub max_placement_tries: usize,
    /// Object populations, instantiated in this order.
    pub objects: Vec<ObjectSpec>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        EnvConfig {
            width: 8,
            height: 8,
            max_steps: 100_000,
            see_through_walls: false,
            seed: 1337,
            view_size: 7,
            max_placement_tries: 10_000,
            objects: Vec::new(),
        }
    }
}

impl EnvConfig {
    /// Square grid with default settings otherwise.
    pub fn square(size: usize) -> Self {
        EnvConfig {
            width: size,
            height: size,
            ..EnvConfig::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < 3 || self.height < 3 {
            return Err(ConfigError::GridTooSmall {
                width: self.width,
                height: self.height,
            });
        }
        if self.view_size < 3 || self.view_size % 2 == 0 {
            return Err(ConfigError::InvalidViewSize(self.view_size));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::ZeroMaxSteps);
        }
        if self.max_placement_tries == 0 {
            return Err(ConfigError::ZeroPlacementTries);
        }
        if let Some(spec) = self.objects.iter().find(|spec| {
            matches!(
                spec.kind,
                ObjectKind::Unseen | ObjectKind::Empty | ObjectKind::Agent
            )
        }) {
            return Err(ConfigError::InvalidObjectKind(spec.kind));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(EnvConfig::default().validate(), Ok(()));
        assert_eq!(EnvConfig::square(5).width, 5);
    }

    #[test]
    fn validation_rejects_bad_shapes() {
        let config = EnvConfig {
            width: 2,
            ..EnvConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::GridTooSmall {
                width: 2,
                height: 8
            })
        );

        let config = EnvConfig {
            view_size: 4,
            ..EnvConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidViewSize(4)));

        let config = EnvConfig {
            objects: vec![ObjectSpec::new(ObjectKind::Agent, 1)],
            ..EnvConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidObjectKind(ObjectKind::Agent))
        );
    }
}
