use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use prism_common::ComponentKind;
use prism_registry::{Component, ComponentMeta, Handle, Registry, RegistryError};

/// Position, rotation and scale of an entity in world space.
#[derive(Debug, Clone)]
pub struct Transform {
    meta: ComponentMeta,
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformStruct {
    pub local_to_world: [[f32; 4]; 4],
    pub world_to_local: [[f32; 4]; 4],
}

impl Transform {
    pub fn create(
        transforms: &Registry<Transform>,
        name: &str,
    ) -> Result<Handle<Transform>, RegistryError> {
        transforms.create(name)
    }

    pub fn create_with_transform(
        transforms: &Registry<Transform>,
        name: &str,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<Handle<Transform>, RegistryError> {
        transforms.create_with(name, |transform| {
            transform.set_position(position);
            transform.set_rotation(rotation);
            transform.set_scale(scale);
            Ok(())
        })
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.meta.mark_dirty();
    }

    /// Translate by `offset`.
    pub fn add_position(&mut self, offset: Vec3) {
        self.set_position(self.position + offset);
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.meta.mark_dirty();
    }

    /// Apply `rotation` on top of the current one.
    pub fn add_rotation(&mut self, rotation: Quat) {
        self.set_rotation((rotation * self.rotation).normalize());
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.meta.mark_dirty();
    }

    pub fn local_to_world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Component for Transform {
    const KIND: ComponentKind = ComponentKind::Transform;
    type Struct = TransformStruct;

    fn with_meta(meta: ComponentMeta) -> Self {
        Self {
            meta,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }

    fn to_struct(&self) -> TransformStruct {
        let local_to_world = self.local_to_world_matrix();
        TransformStruct {
            local_to_world: local_to_world.to_cols_array_2d(),
            world_to_local: local_to_world.inverse().to_cols_array_2d(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Transform",
            "name": self.name(),
            "id": self.id(),
            "position": self.position,
            "rotation": self.rotation,
            "scale": self.scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrices(transforms: &Registry<Transform>, h: Handle<Transform>) -> (Mat4, Mat4) {
        let s = transforms.lock().front_struct().unwrap()[h.index() as usize];
        (
            Mat4::from_cols_array_2d(&s.local_to_world),
            Mat4::from_cols_array_2d(&s.world_to_local),
        )
    }

    #[test]
    fn identity_by_default() {
        let transforms = Registry::with_capacity(4);
        let h = Transform::create(&transforms, "root").unwrap();
        transforms.update_components().unwrap();
        let (l2w, w2l) = matrices(&transforms, h);
        assert_eq!(l2w, Mat4::IDENTITY);
        assert_eq!(w2l, Mat4::IDENTITY);
    }

    #[test]
    fn matrices_are_inverse() {
        let transforms = Registry::with_capacity(4);
        let h = Transform::create_with_transform(
            &transforms,
            "box",
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(0.5),
            Vec3::splat(2.0),
        )
        .unwrap();
        transforms.update_components().unwrap();
        let (l2w, w2l) = matrices(&transforms, h);
        let p = Vec3::new(-4.0, 0.5, 9.0);
        assert!((w2l.transform_point3(l2w.transform_point3(p)) - p).length() < 1e-4);
        assert!((l2w.transform_point3(Vec3::ZERO) - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
    }

    #[test]
    fn add_position_accumulates() {
        let transforms = Registry::with_capacity(4);
        let h = Transform::create(&transforms, "mover").unwrap();
        for _ in 0..3 {
            transforms.edit(h, |t| t.add_position(Vec3::X)).unwrap();
        }
        assert_eq!(transforms.read(h, |t| t.position()).unwrap(), Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn add_rotation_composes() {
        let transforms = Registry::with_capacity(4);
        let h = Transform::create(&transforms, "spinner").unwrap();
        transforms
            .edit(h, |t| {
                t.add_rotation(Quat::from_rotation_z(0.25));
                t.add_rotation(Quat::from_rotation_z(0.25));
            })
            .unwrap();
        let r = transforms.read(h, |t| t.rotation()).unwrap();
        assert!(r.angle_between(Quat::from_rotation_z(0.5)) < 1e-5);
    }
}
