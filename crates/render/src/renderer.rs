use glam::Mat4;
use prism_registry::{Component, Handle};
use prism_scene::{Camera, Scene};
use std::fmt::Write;

use crate::backend::RenderError;

/// Which camera to render through and which entities to include.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderView {
    /// `None` picks the first live camera.
    pub camera: Option<Handle<Camera>>,
    /// Also list entities whose visibility flag is off.
    pub include_hidden: bool,
}

/// Renderer-agnostic interface.
///
/// A renderer reads the front arrays produced by the last synchronization
/// pass. It never mutates records and never runs the pass itself.
pub trait Renderer {
    type Output;

    fn render(&self, scene: &Scene, view: &RenderView) -> Result<Self::Output, RenderError>;
}

/// Text renderer for CLI output, logging and tests.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, scene: &Scene, view: &RenderView) -> Result<String, RenderError> {
        let mut out = String::new();
        let _ = writeln!(out, "=== Scene ===");
        for table in scene.tables() {
            let _ = writeln!(
                out,
                "{:<10} {}/{}",
                table.kind().as_str(),
                table.len()?,
                table.capacity()?
            );
        }

        let cameras = scene.cameras.lock();
        let camera_records = cameras.front()?;
        let camera_structs = cameras.front_struct()?;
        let selected = match view.camera {
            Some(h) => Some(h.index() as usize),
            None => camera_records.iter().position(|c| c.meta().is_initialized()),
        };
        match selected.and_then(|i| Some((camera_records.get(i)?, camera_structs.get(i)?))) {
            Some((record, s)) if record.meta().is_initialized() => {
                let _ = writeln!(
                    out,
                    "Camera: {} fov={:.1} aspect={:.2}",
                    record.meta().name(),
                    s.fov.to_degrees(),
                    s.aspect
                );
            }
            _ => {
                let _ = writeln!(out, "Camera: none");
            }
        }

        let transforms = scene.transforms.lock();
        let transform_structs = transforms.front_struct()?;
        let entities = scene.entities.lock();
        let entity_records = entities.front()?;
        let entity_structs = entities.front_struct()?;
        for (record, s) in entity_records.iter().zip(entity_structs.iter()) {
            if s.initialized == 0 || (s.visible == 0 && !view.include_hidden) {
                continue;
            }
            let position = usize::try_from(s.transform_id)
                .ok()
                .and_then(|i| transform_structs.get(i))
                .map(|t| Mat4::from_cols_array_2d(&t.local_to_world).w_axis.truncate());
            let _ = match position {
                Some(p) => writeln!(
                    out,
                    "  [{}] {} pos=({:.2}, {:.2}, {:.2})",
                    record.meta().id(),
                    record.meta().name(),
                    p.x,
                    p.y,
                    p.z
                ),
                None => writeln!(out, "  [{}] {} pos=none", record.meta().id(), record.meta().name()),
            };
        }

        Ok(out)
    }
}
