use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use prism_common::ComponentKind;
use prism_registry::{Component, ComponentMeta, Handle, Registry, RegistryError};

/// A pinhole or thin-lens perspective camera.
#[derive(Debug, Clone)]
pub struct Camera {
    meta: ComponentMeta,
    /// Vertical field of view in radians.
    fov: f32,
    aspect: f32,
    near: f32,
    focal_distance: f32,
    aperture_diameter: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraStruct {
    /// Column-major projection with an infinite far plane.
    pub projection: [[f32; 4]; 4],
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub focal_distance: f32,
    pub aperture_diameter: f32,
}

impl Camera {
    pub fn create(cameras: &Registry<Camera>, name: &str) -> Result<Handle<Camera>, RegistryError> {
        cameras.create(name)
    }

    /// `fov` is the vertical field of view in radians, `aspect` is width over
    /// height.
    pub fn create_perspective_from_fov(
        cameras: &Registry<Camera>,
        name: &str,
        fov: f32,
        aspect: f32,
    ) -> Result<Handle<Camera>, RegistryError> {
        cameras.create_with(name, |camera| {
            camera.set_perspective_from_fov(fov, aspect);
            Ok(())
        })
    }

    /// Derive the field of view from a lens focal length and sensor size, all
    /// in millimeters.
    pub fn create_perspective_from_focal_length(
        cameras: &Registry<Camera>,
        name: &str,
        focal_length: f32,
        sensor_width: f32,
        sensor_height: f32,
    ) -> Result<Handle<Camera>, RegistryError> {
        cameras.create_with(name, |camera| {
            camera.set_perspective_from_focal_length(focal_length, sensor_width, sensor_height);
            Ok(())
        })
    }

    pub fn set_perspective_from_fov(&mut self, fov: f32, aspect: f32) {
        self.fov = fov;
        self.aspect = aspect;
        self.meta.mark_dirty();
    }

    pub fn set_perspective_from_focal_length(
        &mut self,
        focal_length: f32,
        sensor_width: f32,
        sensor_height: f32,
    ) {
        let fov = 2.0 * (sensor_height / (2.0 * focal_length)).atan();
        self.set_perspective_from_fov(fov, sensor_width / sensor_height);
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn set_near(&mut self, near: f32) {
        self.near = near;
        self.meta.mark_dirty();
    }

    pub fn focal_distance(&self) -> f32 {
        self.focal_distance
    }

    /// Distance to the plane in perfect focus.
    pub fn set_focal_distance(&mut self, distance: f32) {
        self.focal_distance = distance;
        self.meta.mark_dirty();
    }

    pub fn aperture_diameter(&self) -> f32 {
        self.aperture_diameter
    }

    /// Lens aperture. Zero gives a pinhole camera with no depth of field.
    pub fn set_aperture_diameter(&mut self, diameter: f32) {
        self.aperture_diameter = diameter;
        self.meta.mark_dirty();
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_infinite_rh(self.fov, self.aspect, self.near)
    }
}

impl Component for Camera {
    const KIND: ComponentKind = ComponentKind::Camera;
    type Struct = CameraStruct;

    fn with_meta(meta: ComponentMeta) -> Self {
        Self {
            meta,
            fov: std::f32::consts::FRAC_PI_4,
            aspect: 1.0,
            near: 0.05,
            focal_distance: 1.0,
            aperture_diameter: 0.0,
        }
    }

    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }

    fn to_struct(&self) -> CameraStruct {
        CameraStruct {
            projection: self.projection().to_cols_array_2d(),
            fov: self.fov,
            aspect: self.aspect,
            near: self.near,
            focal_distance: self.focal_distance,
            aperture_diameter: self.aperture_diameter,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Camera",
            "name": self.name(),
            "id": self.id(),
            "fov": self.fov,
            "aspect": self.aspect,
            "near": self.near,
            "focal_distance": self.focal_distance,
            "aperture_diameter": self.aperture_diameter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn fov_camera_projection() {
        let cameras = Registry::with_capacity(2);
        let h = Camera::create_perspective_from_fov(&cameras, "main", FRAC_PI_2, 2.0).unwrap();
        cameras.update_components().unwrap();

        let s = cameras.lock().front_struct().unwrap()[h.index() as usize];
        assert_eq!(s.fov, FRAC_PI_2);
        assert_eq!(s.aspect, 2.0);
        // 90 degrees: cot(fov / 2) == 1
        assert!((s.projection[1][1] - 1.0).abs() < 1e-6);
        assert!((s.projection[0][0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn focal_length_derives_fov() {
        let cameras = Registry::with_capacity(2);
        // 24mm sensor height at 12mm focal length gives a 90 degree fov
        let h = Camera::create_perspective_from_focal_length(&cameras, "lens", 12.0, 36.0, 24.0)
            .unwrap();
        let (fov, aspect) = cameras.read(h, |c| (c.fov(), c.aspect())).unwrap();
        assert!((fov - FRAC_PI_2).abs() < 1e-6);
        assert_eq!(aspect, 1.5);
    }

    #[test]
    fn depth_of_field_settings_dirty_the_camera() {
        let cameras = Registry::with_capacity(2);
        let h = Camera::create(&cameras, "dof").unwrap();
        cameras.update_components().unwrap();
        assert!(!cameras.are_any_dirty());

        cameras
            .edit(h, |c| {
                c.set_focal_distance(3.5);
                c.set_aperture_diameter(0.1);
            })
            .unwrap();
        assert!(cameras.are_any_dirty());
        cameras.update_components().unwrap();
        let s = cameras.lock().front_struct().unwrap()[0];
        assert_eq!(s.focal_distance, 3.5);
        assert_eq!(s.aperture_diameter, 0.1);
    }
}
