use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use prism_common::ComponentKind;
use prism_registry::{Component, ComponentMeta, Handle, Registry, RegistryError};

use crate::texture::Texture;

/// Surface appearance, a subset of a principled BSDF.
#[derive(Debug, Clone)]
pub struct Material {
    meta: ComponentMeta,
    base_color: Vec3,
    roughness: f32,
    metallic: f32,
    transmission: f32,
    ior: f32,
    base_color_texture: Option<Handle<Texture>>,
    roughness_texture: Option<Handle<Texture>>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialStruct {
    pub base_color: [f32; 3],
    pub roughness: f32,
    pub metallic: f32,
    pub transmission: f32,
    pub ior: f32,
    /// -1 when unset.
    pub base_color_texture_id: i32,
    pub roughness_texture_id: i32,
}

impl Material {
    pub fn create(
        materials: &Registry<Material>,
        name: &str,
    ) -> Result<Handle<Material>, RegistryError> {
        materials.create(name)
    }

    pub fn base_color(&self) -> Vec3 {
        self.base_color
    }

    pub fn set_base_color(&mut self, color: Vec3) {
        self.base_color = color;
        self.meta.mark_dirty();
    }

    pub fn roughness(&self) -> f32 {
        self.roughness
    }

    pub fn set_roughness(&mut self, roughness: f32) {
        self.roughness = roughness;
        self.meta.mark_dirty();
    }

    pub fn metallic(&self) -> f32 {
        self.metallic
    }

    pub fn set_metallic(&mut self, metallic: f32) {
        self.metallic = metallic;
        self.meta.mark_dirty();
    }

    pub fn transmission(&self) -> f32 {
        self.transmission
    }

    pub fn set_transmission(&mut self, transmission: f32) {
        self.transmission = transmission;
        self.meta.mark_dirty();
    }

    pub fn ior(&self) -> f32 {
        self.ior
    }

    pub fn set_ior(&mut self, ior: f32) {
        self.ior = ior;
        self.meta.mark_dirty();
    }

    pub fn base_color_texture(&self) -> Option<Handle<Texture>> {
        self.base_color_texture
    }

    pub fn set_base_color_texture(&mut self, texture: Option<Handle<Texture>>) {
        self.base_color_texture = texture;
        self.meta.mark_dirty();
    }

    pub fn roughness_texture(&self) -> Option<Handle<Texture>> {
        self.roughness_texture
    }

    pub fn set_roughness_texture(&mut self, texture: Option<Handle<Texture>>) {
        self.roughness_texture = texture;
        self.meta.mark_dirty();
    }
}

fn texture_id(texture: Option<Handle<Texture>>) -> i32 {
    texture.map_or(-1, |t| t.index() as i32)
}

impl Component for Material {
    const KIND: ComponentKind = ComponentKind::Material;
    type Struct = MaterialStruct;

    fn with_meta(meta: ComponentMeta) -> Self {
        Self {
            meta,
            base_color: Vec3::splat(0.8),
            roughness: 0.5,
            metallic: 0.0,
            transmission: 0.0,
            ior: 1.45,
            base_color_texture: None,
            roughness_texture: None,
        }
    }

    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }

    fn to_struct(&self) -> MaterialStruct {
        MaterialStruct {
            base_color: self.base_color.to_array(),
            roughness: self.roughness,
            metallic: self.metallic,
            transmission: self.transmission,
            ior: self.ior,
            base_color_texture_id: texture_id(self.base_color_texture),
            roughness_texture_id: texture_id(self.roughness_texture),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Material",
            "name": self.name(),
            "id": self.id(),
            "base_color": self.base_color,
            "roughness": self.roughness,
            "metallic": self.metallic,
            "transmission": self.transmission,
            "ior": self.ior,
            "base_color_texture": self.base_color_texture.map(|t| t.index()),
            "roughness_texture": self.roughness_texture.map(|t| t.index()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reach_the_struct() {
        let materials = Registry::with_capacity(4);
        let h = Material::create(&materials, "clay").unwrap();
        materials.update_components().unwrap();
        let s = materials.lock().front_struct().unwrap()[h.index() as usize];
        assert_eq!(s.base_color, [0.8; 3]);
        assert_eq!(s.roughness, 0.5);
        assert_eq!(s.ior, 1.45);
        assert_eq!(s.base_color_texture_id, -1);
        assert_eq!(s.roughness_texture_id, -1);
    }

    #[test]
    fn texture_references() {
        let materials = Registry::with_capacity(4);
        let h = Material::create(&materials, "wood").unwrap();
        materials
            .edit(h, |m| {
                m.set_base_color_texture(Some(Handle::from_index(7)));
                m.set_metallic(1.0);
            })
            .unwrap();
        materials.update_components().unwrap();
        let s = materials.lock().front_struct().unwrap()[h.index() as usize];
        assert_eq!(s.base_color_texture_id, 7);
        assert_eq!(s.metallic, 1.0);
    }

    #[test]
    fn last_write_wins_before_sync() {
        let materials = Registry::with_capacity(4);
        let h = Material::create(&materials, "glass").unwrap();
        materials.edit(h, |m| m.set_transmission(0.3)).unwrap();
        materials.edit(h, |m| m.set_transmission(1.0)).unwrap();
        assert_eq!(materials.update_components().unwrap(), 1);
        let s = materials.lock().front_struct().unwrap()[0];
        assert_eq!(s.transmission, 1.0);
    }
}
