//! Shared types for the prism scene layer: component kinds, bounds,
//! scene configuration and loader errors.

mod config;
mod loader;
mod types;

pub use config::{ConfigError, SceneConfig};
pub use loader::{LoadError, extension_of};
pub use types::{Aabb, ComponentKind, ParseKindError};

pub fn crate_info() -> &'static str {
    "prism-common v0.1.0"
}
