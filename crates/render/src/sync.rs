use prism_common::ComponentKind;
use prism_registry::{Component, Handle, Registry};
use prism_scene::{Scene, SyncReport};
use std::time::{Duration, Instant};

use crate::backend::{RenderBackend, RenderError};

/// What one frame's synchronization did.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub frame: u64,
    pub report: SyncReport,
    /// Kinds whose struct array was re-uploaded, in upload order.
    pub uploaded: Vec<ComponentKind>,
    pub duration: Duration,
}

impl FrameStats {
    pub fn synced(&self) -> usize {
        self.report.total()
    }
}

impl std::fmt::Display for FrameStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "frame {}: synced={} uploads={} in {:?}",
            self.frame,
            self.synced(),
            self.uploaded.len(),
            self.duration
        )
    }
}

/// Drives the once-per-frame handoff from scene registries to a backend.
///
/// For each kind, under that registry's lock: run the synchronization pass,
/// forward refreshed payloads, then upload the whole struct array if the kind
/// had anything dirty. Clean kinds cost one atomic load.
#[derive(Debug, Default)]
pub struct SceneSync {
    frame: u64,
}

impl SceneSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames synchronized so far.
    pub fn frames(&self) -> u64 {
        self.frame
    }

    pub fn frame(
        &mut self,
        scene: &Scene,
        backend: &mut dyn RenderBackend,
    ) -> Result<FrameStats, RenderError> {
        let _span = tracing::info_span!("frame_sync", frame = self.frame).entered();
        let start = Instant::now();
        let mut stats = FrameStats {
            frame: self.frame,
            ..FrameStats::default()
        };

        sync_kind(&scene.transforms, backend, &mut stats, |_, _, _| {})?;
        sync_kind(&scene.textures, backend, &mut stats, |backend, h, texture| {
            backend.upload_texels(h.index(), texture.width(), texture.height(), texture.texels());
        })?;
        sync_kind(&scene.volumes, backend, &mut stats, |backend, h, volume| {
            if let Some(grid) = volume.grid() {
                backend.upload_grid(h.index(), grid);
            }
        })?;
        sync_kind(&scene.materials, backend, &mut stats, |_, _, _| {})?;
        sync_kind(&scene.cameras, backend, &mut stats, |_, _, _| {})?;
        sync_kind(&scene.lights, backend, &mut stats, |_, _, _| {})?;
        sync_kind(&scene.entities, backend, &mut stats, |_, _, _| {})?;

        stats.duration = start.elapsed();
        self.frame += 1;
        if !stats.uploaded.is_empty() {
            tracing::debug!(synced = stats.synced(), uploads = stats.uploaded.len(), "frame synchronized");
        }
        Ok(stats)
    }
}

fn sync_kind<T: Component>(
    registry: &Registry<T>,
    backend: &mut dyn RenderBackend,
    stats: &mut FrameStats,
    payload: impl Fn(&mut dyn RenderBackend, Handle<T>, &T),
) -> Result<(), RenderError> {
    let guard = registry.lock();
    let was_dirty = registry.are_any_dirty();
    if !was_dirty {
        stats.report.record(T::KIND, 0);
        return Ok(());
    }

    let synced = registry.update_components_with(|handle, record, _| {
        payload(&mut *backend, handle, record);
    })?;
    stats.report.record(T::KIND, synced);

    let bytes = guard.front_struct_bytes()?;
    let count = registry.capacity()? as usize;
    backend.upload(T::KIND, &bytes, count)?;
    stats.uploaded.push(T::KIND);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use bytemuck::Zeroable;
    use glam::{Vec3, Vec4};
    use prism_common::{Aabb, SceneConfig};
    use prism_scene::{
        EntityParts, GridHandle, GridType, Light, LightStruct, Texture, Transform, Volume,
    };

    fn scene() -> Scene {
        Scene::with_config(&SceneConfig::uniform(4)).unwrap()
    }

    #[test]
    fn clean_scene_uploads_nothing() {
        let scene = scene();
        let mut backend = RecordingBackend::new();
        let mut sync = SceneSync::new();
        let stats = sync.frame(&scene, &mut backend).unwrap();
        assert_eq!(stats.synced(), 0);
        assert!(stats.uploaded.is_empty());
        assert!(backend.uploads.is_empty());
        assert_eq!(sync.frames(), 1);
    }

    #[test]
    fn only_dirty_kinds_are_uploaded() {
        let scene = scene();
        let sun = Light::create_from_rgb(&scene.lights, "sun", Vec3::ONE, 5.0).unwrap();
        let mut backend = RecordingBackend::new();
        let mut sync = SceneSync::new();

        let stats = sync.frame(&scene, &mut backend).unwrap();
        assert_eq!(stats.uploaded, vec![ComponentKind::Light]);
        let lights: Vec<LightStruct> = backend.structs(ComponentKind::Light).unwrap();
        assert_eq!(lights.len(), 4);
        assert_eq!(lights[sun.index() as usize].intensity, 5.0);

        // nothing changed: no second upload
        sync.frame(&scene, &mut backend).unwrap();
        assert_eq!(backend.upload_count(ComponentKind::Light), 1);

        scene.lights.edit(sun, |l| l.set_intensity(7.0)).unwrap();
        sync.frame(&scene, &mut backend).unwrap();
        let lights: Vec<LightStruct> = backend.structs(ComponentKind::Light).unwrap();
        assert_eq!(lights[sun.index() as usize].intensity, 7.0);
    }

    #[test]
    fn removal_uploads_null_struct() {
        let scene = scene();
        let sun = Light::create(&scene.lights, "sun").unwrap();
        let mut backend = RecordingBackend::new();
        let mut sync = SceneSync::new();
        sync.frame(&scene, &mut backend).unwrap();

        scene.lights.remove("sun").unwrap();
        let stats = sync.frame(&scene, &mut backend).unwrap();
        assert_eq!(stats.report.synced(ComponentKind::Light), 1);
        let lights: Vec<LightStruct> = backend.structs(ComponentKind::Light).unwrap();
        assert_eq!(lights[sun.index() as usize], LightStruct::zeroed());
    }

    #[test]
    fn payloads_follow_refreshed_records() {
        let scene = scene();
        let tex = Texture::create_from_data(&scene.textures, "t", 2, 2, vec![Vec4::ONE; 4]).unwrap();
        let grid = GridHandle::new(
            "density",
            GridType::Float,
            vec![vec![Aabb::new(Vec3::ZERO, Vec3::ONE)]],
            vec![1u8, 2, 3],
        );
        let vol = Volume::create_from_grid(&scene.volumes, "v", grid).unwrap();
        let mut backend = RecordingBackend::new();
        let mut sync = SceneSync::new();

        sync.frame(&scene, &mut backend).unwrap();
        assert_eq!(backend.texel_uploads, vec![(tex.index(), 4)]);
        assert_eq!(backend.grid_uploads, vec![(vol.index(), "density".to_owned())]);

        // parameter-only edits still re-send the payload of that record only
        backend.clear();
        scene.volumes.edit(vol, |v| v.set_scale(0.1)).unwrap();
        sync.frame(&scene, &mut backend).unwrap();
        assert!(backend.texel_uploads.is_empty());
        assert_eq!(backend.grid_uploads.len(), 1);
    }

    #[test]
    fn uploads_follow_sync_order() {
        let scene = scene();
        let t = Transform::create(&scene.transforms, "t").unwrap();
        scene
            .create_entity(
                "e",
                EntityParts {
                    transform: Some(t),
                    ..Default::default()
                },
            )
            .unwrap();
        Light::create(&scene.lights, "l").unwrap();

        let mut backend = RecordingBackend::new();
        let stats = SceneSync::new().frame(&scene, &mut backend).unwrap();
        assert_eq!(
            stats.uploaded,
            vec![
                ComponentKind::Transform,
                ComponentKind::Light,
                ComponentKind::Entity
            ]
        );
    }

    #[test]
    fn render_thread_sees_consistent_frames() {
        let scene = scene();
        let sun = Light::create(&scene.lights, "sun").unwrap();
        let mut backend = RecordingBackend::new();

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..200 {
                    scene.lights.edit(sun, |l| l.set_intensity(i as f32)).unwrap();
                }
            });
            let mut sync = SceneSync::new();
            for _ in 0..50 {
                sync.frame(&scene, &mut backend).unwrap();
            }
        });

        SceneSync::new().frame(&scene, &mut backend).unwrap();
        let lights: Vec<LightStruct> = backend.structs(ComponentKind::Light).unwrap();
        assert_eq!(lights[sun.index() as usize].intensity, 199.0);
        assert!(!scene.are_any_dirty());
    }
}
