use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::ComponentKind;

/// Errors from loading or validating a [`SceneConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("capacity for {0} must be greater than zero")]
    ZeroCapacity(ComponentKind),
}

/// Per-kind registry capacities.
///
/// Capacities are fixed for the lifetime of a scene; slot indices handed to
/// the renderer stay valid because the tables never grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub max_entities: u32,
    pub max_transforms: u32,
    pub max_materials: u32,
    pub max_cameras: u32,
    pub max_lights: u32,
    pub max_textures: u32,
    pub max_volumes: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            max_entities: 100_000,
            max_transforms: 100_000,
            max_materials: 100_000,
            max_cameras: 10,
            max_lights: 100,
            max_textures: 1000,
            max_volumes: 1000,
        }
    }
}

impl SceneConfig {
    /// A config with the same capacity for every kind. Handy for tests and demos.
    pub fn uniform(capacity: u32) -> Self {
        Self {
            max_entities: capacity,
            max_transforms: capacity,
            max_materials: capacity,
            max_cameras: capacity,
            max_lights: capacity,
            max_textures: capacity,
            max_volumes: capacity,
        }
    }

    /// Capacity configured for the given kind.
    pub fn capacity(&self, kind: ComponentKind) -> u32 {
        match kind {
            ComponentKind::Entity => self.max_entities,
            ComponentKind::Transform => self.max_transforms,
            ComponentKind::Material => self.max_materials,
            ComponentKind::Camera => self.max_cameras,
            ComponentKind::Light => self.max_lights,
            ComponentKind::Texture => self.max_textures,
            ComponentKind::Volume => self.max_volumes,
        }
    }

    /// Reject configs with a zero capacity for any kind.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in ComponentKind::ALL {
            if self.capacity(kind) == 0 {
                return Err(ConfigError::ZeroCapacity(kind));
            }
        }
        Ok(())
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = SceneConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capacity(ComponentKind::Camera), 10);
        assert_eq!(config.capacity(ComponentKind::Light), 100);
    }

    #[test]
    fn zero_capacity_rejected() {
        let config = SceneConfig {
            max_volumes: 0,
            ..SceneConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroCapacity(ComponentKind::Volume))
        ));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, r#"{{ "max_lights": 8 }}"#).unwrap();

        let config = SceneConfig::load(tmp.path()).unwrap();
        assert_eq!(config.max_lights, 8);
        assert_eq!(config.max_textures, SceneConfig::default().max_textures);
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let config = SceneConfig::uniform(16);
        config.save(tmp.path()).unwrap();

        let loaded = SceneConfig::load(tmp.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "not json").unwrap();
        assert!(matches!(
            SceneConfig::load(tmp.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
