use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use prism_common::ComponentKind;
use prism_registry::{Component, ComponentMeta, Handle, Registry, RegistryError};

use crate::texture::Texture;

/// A light source. Lights only illuminate the scene once an entity with a
/// transform references them.
///
/// Inputs are not range checked: negative intensities or colors above one are
/// stored as given and interpreted by the renderer.
#[derive(Debug, Clone)]
pub struct Light {
    meta: ComponentMeta,
    color: Vec3,
    color_texture: Option<Handle<Texture>>,
    intensity: f32,
    exposure: f32,
    falloff: f32,
    use_surface_area: bool,
}

/// Render-side projection of a [`Light`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightStruct {
    pub color: [f32; 3],
    pub intensity: f32,
    pub exposure: f32,
    pub falloff: f32,
    /// Texture id, or -1 when the constant color is used.
    pub color_texture_id: i32,
    pub use_surface_area: u32,
}

impl Light {
    /// Create a white light with unit intensity.
    pub fn create(lights: &Registry<Light>, name: &str) -> Result<Handle<Light>, RegistryError> {
        lights.create(name)
    }

    /// Create a light emitting `color` at `intensity`.
    pub fn create_from_rgb(
        lights: &Registry<Light>,
        name: &str,
        color: Vec3,
        intensity: f32,
    ) -> Result<Handle<Light>, RegistryError> {
        lights.create_with(name, |light| {
            light.set_color(color);
            light.set_intensity(intensity);
            Ok(())
        })
    }

    /// Create a light whose color approximates a black body at `kelvin`.
    /// Typical values range from 1000K (warm) to 12000K (cold).
    pub fn create_from_temperature(
        lights: &Registry<Light>,
        name: &str,
        kelvin: f32,
        intensity: f32,
    ) -> Result<Handle<Light>, RegistryError> {
        lights.create_with(name, |light| {
            light.set_temperature(kelvin);
            light.set_intensity(intensity);
            Ok(())
        })
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
        self.meta.mark_dirty();
    }

    /// Drive the emitted color from an RGB texture, overriding the constant color.
    pub fn set_color_texture(&mut self, texture: Handle<Texture>) {
        self.color_texture = Some(texture);
        self.meta.mark_dirty();
    }

    /// Revert to the constant color.
    pub fn clear_color_texture(&mut self) {
        self.color_texture = None;
        self.meta.mark_dirty();
    }

    pub fn color_texture(&self) -> Option<Handle<Texture>> {
        self.color_texture
    }

    pub fn set_temperature(&mut self, kelvin: f32) {
        self.set_color(kelvin_to_rgb(kelvin));
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
        self.meta.mark_dirty();
    }

    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    /// Scale emitted power by `2^exposure`. Zero leaves intensity unchanged,
    /// +1 doubles it, -1 halves it.
    pub fn set_exposure(&mut self, exposure: f32) {
        self.exposure = exposure;
        self.meta.mark_dirty();
    }

    pub fn falloff(&self) -> f32 {
        self.falloff
    }

    /// Distance falloff exponent: 2 is physically based, 1 is linear, 0
    /// disables falloff.
    pub fn set_falloff(&mut self, falloff: f32) {
        self.falloff = falloff;
        self.meta.mark_dirty();
    }

    pub fn uses_surface_area(&self) -> bool {
        self.use_surface_area
    }

    /// Whether the emitter's surface area scales its intensity.
    pub fn use_surface_area(&mut self, enabled: bool) {
        self.use_surface_area = enabled;
        self.meta.mark_dirty();
    }

    /// Intensity after exposure is applied.
    pub fn power(&self) -> f32 {
        self.intensity * self.exposure.exp2()
    }
}

impl Component for Light {
    const KIND: ComponentKind = ComponentKind::Light;
    type Struct = LightStruct;

    fn with_meta(meta: ComponentMeta) -> Self {
        Self {
            meta,
            color: Vec3::ONE,
            color_texture: None,
            intensity: 1.0,
            exposure: 0.0,
            falloff: 2.0,
            use_surface_area: false,
        }
    }

    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }

    fn to_struct(&self) -> LightStruct {
        LightStruct {
            color: self.color.to_array(),
            intensity: self.intensity,
            exposure: self.exposure,
            falloff: self.falloff,
            color_texture_id: self.color_texture.map_or(-1, |t| t.index() as i32),
            use_surface_area: self.use_surface_area as u32,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Light",
            "name": self.name(),
            "id": self.id(),
            "color": self.color,
            "color_texture": self.color_texture.map(|t| t.index()),
            "intensity": self.intensity,
            "exposure": self.exposure,
            "falloff": self.falloff,
            "use_surface_area": self.use_surface_area,
        })
    }
}

/// Approximate sRGB color of a black body at `kelvin` (Tanner Helland fit).
pub fn kelvin_to_rgb(kelvin: f32) -> Vec3 {
    let t = kelvin / 100.0;

    let red = if t <= 66.0 {
        255.0
    } else {
        329.698_73 * (t - 60.0).powf(-0.133_204_76)
    };
    let green = if t <= 66.0 {
        99.470_8 * t.ln() - 161.119_57
    } else {
        288.122_17 * (t - 60.0).powf(-0.075_514_85)
    };
    let blue = if t >= 66.0 {
        255.0
    } else if t <= 19.0 {
        0.0
    } else {
        138.517_73 * (t - 10.0).ln() - 305.044_8
    };

    Vec3::new(red, green, blue).clamp(Vec3::ZERO, Vec3::splat(255.0)) / 255.0
}
