//! Scene components and the scene context that owns their registries.
//!
//! Every kind (lights, textures, volumes, cameras, materials, transforms and
//! entities) is a record type stored in a `prism_registry::Registry`, paired
//! with a `#[repr(C)]` render struct. Convenience constructors build a record
//! and apply its setters inside `create_with`, so a failing setter leaves no
//! record behind.
//!
//! # Invariants
//! - Every setter marks its record dirty, even when the value is unchanged.
//! - Render structs hold only plain-old-data; references become slot ids,
//!   with -1 meaning "none".
//! - File payloads (images, sparse grids) are decoded before any registry
//!   lock is taken.
//! - Entity references are checked at creation by `Scene::create_entity`;
//!   later removals of the referenced records are not tracked.

pub mod camera;
pub mod entity;
pub mod light;
pub mod material;
pub mod scene;
pub mod texture;
pub mod transform;
pub mod volume;

pub use camera::{Camera, CameraStruct};
pub use entity::{Entity, EntityParts, EntityStruct};
pub use light::{Light, LightStruct, kelvin_to_rgb};
pub use material::{Material, MaterialStruct};
pub use scene::{ComponentTable, Scene, SceneError, SyncReport};
pub use texture::{DecodedImage, ImageLoader, Texture, TextureError, TextureStruct};
pub use transform::{Transform, TransformStruct};
pub use volume::{GridHandle, GridLoader, GridType, Volume, VolumeError, VolumeStruct};

pub fn crate_info() -> &'static str {
    "prism-scene v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("scene"));
    }
}
