use bytemuck::{Pod, Zeroable};
use prism_common::ComponentKind;
use prism_registry::{Component, ComponentMeta, Handle, Registry, RegistryError};

use crate::camera::Camera;
use crate::light::Light;
use crate::material::Material;
use crate::transform::Transform;
use crate::volume::Volume;

/// The components an entity ties together. Every field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityParts {
    pub transform: Option<Handle<Transform>>,
    pub material: Option<Handle<Material>>,
    pub light: Option<Handle<Light>>,
    pub camera: Option<Handle<Camera>>,
    pub volume: Option<Handle<Volume>>,
}

/// An object in the scene: a transform plus whatever it renders as.
#[derive(Debug, Clone)]
pub struct Entity {
    meta: ComponentMeta,
    parts: EntityParts,
    visible: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct EntityStruct {
    /// Component ids, -1 when unset.
    pub transform_id: i32,
    pub material_id: i32,
    pub light_id: i32,
    pub camera_id: i32,
    pub volume_id: i32,
    pub visible: u32,
    pub initialized: u32,
}

fn slot<T>(handle: Option<Handle<T>>) -> i32 {
    handle.map_or(-1, |h| h.index() as i32)
}

impl Entity {
    pub fn create(entities: &Registry<Entity>, name: &str) -> Result<Handle<Entity>, RegistryError> {
        entities.create(name)
    }

    /// Create an entity wired to `parts`. The handles are stored as given;
    /// use `Scene::create_entity` to check that they name live records.
    pub fn create_with_components(
        entities: &Registry<Entity>,
        name: &str,
        parts: EntityParts,
    ) -> Result<Handle<Entity>, RegistryError> {
        entities.create_with(name, |entity| {
            entity.set_parts(parts);
            Ok(())
        })
    }

    pub fn parts(&self) -> EntityParts {
        self.parts
    }

    pub fn set_parts(&mut self, parts: EntityParts) {
        self.parts = parts;
        self.meta.mark_dirty();
    }

    pub fn set_transform(&mut self, transform: Option<Handle<Transform>>) {
        self.parts.transform = transform;
        self.meta.mark_dirty();
    }

    pub fn set_material(&mut self, material: Option<Handle<Material>>) {
        self.parts.material = material;
        self.meta.mark_dirty();
    }

    pub fn set_light(&mut self, light: Option<Handle<Light>>) {
        self.parts.light = light;
        self.meta.mark_dirty();
    }

    pub fn set_camera(&mut self, camera: Option<Handle<Camera>>) {
        self.parts.camera = camera;
        self.meta.mark_dirty();
    }

    pub fn set_volume(&mut self, volume: Option<Handle<Volume>>) {
        self.parts.volume = volume;
        self.meta.mark_dirty();
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.meta.mark_dirty();
    }
}

impl Component for Entity {
    const KIND: ComponentKind = ComponentKind::Entity;
    type Struct = EntityStruct;

    fn with_meta(meta: ComponentMeta) -> Self {
        Self {
            meta,
            parts: EntityParts::default(),
            visible: true,
        }
    }

    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }

    fn to_struct(&self) -> EntityStruct {
        EntityStruct {
            transform_id: slot(self.parts.transform),
            material_id: slot(self.parts.material),
            light_id: slot(self.parts.light),
            camera_id: slot(self.parts.camera),
            volume_id: slot(self.parts.volume),
            visible: self.visible as u32,
            initialized: 1,
        }
    }

    /// Empty slots read as "no component" rather than as slot 0.
    fn null_struct() -> EntityStruct {
        EntityStruct {
            transform_id: -1,
            material_id: -1,
            light_id: -1,
            camera_id: -1,
            volume_id: -1,
            visible: 0,
            initialized: 0,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Entity",
            "name": self.name(),
            "id": self.id(),
            "transform": self.parts.transform.map(|h| h.index()),
            "material": self.parts.material.map(|h| h.index()),
            "light": self.parts.light.map(|h| h.index()),
            "camera": self.parts.camera.map(|h| h.index()),
            "volume": self.parts.volume.map(|h| h.index()),
            "visible": self.visible,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_with_components_fills_ids() {
        let entities = Registry::with_capacity(4);
        let parts = EntityParts {
            transform: Some(Handle::from_index(2)),
            light: Some(Handle::from_index(0)),
            ..Default::default()
        };
        let h = Entity::create_with_components(&entities, "lamp", parts).unwrap();
        entities.update_components().unwrap();

        let s = entities.lock().front_struct().unwrap()[h.index() as usize];
        assert_eq!(s.transform_id, 2);
        assert_eq!(s.light_id, 0);
        assert_eq!(s.material_id, -1);
        assert_eq!(s.visible, 1);
        assert_eq!(s.initialized, 1);
    }

    #[test]
    fn removed_entity_reads_as_unset() {
        let entities = Registry::with_capacity(4);
        let parts = EntityParts {
            camera: Some(Handle::from_index(1)),
            ..Default::default()
        };
        let h = Entity::create_with_components(&entities, "eye", parts).unwrap();
        entities.update_components().unwrap();
        entities.remove("eye").unwrap();
        entities.update_components().unwrap();

        let s = entities.lock().front_struct().unwrap()[h.index() as usize];
        assert_eq!(s, Entity::null_struct());
    }

    #[test]
    fn visibility_toggle() {
        let entities = Registry::with_capacity(4);
        let h = Entity::create(&entities, "ghost").unwrap();
        entities.edit(h, |e| e.set_visible(false)).unwrap();
        entities.update_components().unwrap();
        assert_eq!(entities.lock().front_struct().unwrap()[0].visible, 0);
        assert!(!entities.read(h, |e| e.is_visible()).unwrap());
    }
}
