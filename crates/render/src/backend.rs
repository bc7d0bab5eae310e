use glam::Vec4;
use prism_common::ComponentKind;
use prism_scene::GridHandle;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Registry(#[from] prism_registry::RegistryError),
    #[error("backend rejected {kind} upload: {reason}")]
    Upload { kind: ComponentKind, reason: String },
}

/// Device-side consumer of the scene's render structs.
///
/// `upload` receives a kind's whole front struct array as raw bytes. Payload
/// hooks receive the heavy data of textures and volumes whose records were
/// refreshed in the current pass.
pub trait RenderBackend {
    fn upload(&mut self, kind: ComponentKind, bytes: &[u8], count: usize) -> Result<(), RenderError>;

    fn upload_texels(&mut self, _id: u32, _width: u32, _height: u32, _texels: &[Vec4]) {}

    fn upload_grid(&mut self, _id: u32, _grid: &GridHandle) {}
}

/// One recorded struct-array upload.
#[derive(Debug, Clone, PartialEq)]
pub struct StructUpload {
    pub kind: ComponentKind,
    pub count: usize,
    pub bytes: Vec<u8>,
}

/// In-memory backend that keeps every upload it receives.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub uploads: Vec<StructUpload>,
    /// `(texture id, texel count)` per texel upload.
    pub texel_uploads: Vec<(u32, usize)>,
    /// `(volume id, grid name)` per grid upload.
    pub grid_uploads: Vec<(u32, String)>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent upload of `kind`.
    pub fn latest(&self, kind: ComponentKind) -> Option<&StructUpload> {
        self.uploads.iter().rev().find(|u| u.kind == kind)
    }

    /// Decode the most recent upload of `kind` back into structs.
    pub fn structs<S: bytemuck::Pod>(&self, kind: ComponentKind) -> Option<Vec<S>> {
        self.latest(kind)
            .map(|u| bytemuck::pod_collect_to_vec(&u.bytes))
    }

    pub fn upload_count(&self, kind: ComponentKind) -> usize {
        self.uploads.iter().filter(|u| u.kind == kind).count()
    }

    pub fn clear(&mut self) {
        self.uploads.clear();
        self.texel_uploads.clear();
        self.grid_uploads.clear();
    }
}

impl RenderBackend for RecordingBackend {
    fn upload(&mut self, kind: ComponentKind, bytes: &[u8], count: usize) -> Result<(), RenderError> {
        tracing::trace!(%kind, count, bytes = bytes.len(), "struct upload recorded");
        self.uploads.push(StructUpload {
            kind,
            count,
            bytes: bytes.to_vec(),
        });
        Ok(())
    }

    fn upload_texels(&mut self, id: u32, _width: u32, _height: u32, texels: &[Vec4]) {
        self.texel_uploads.push((id, texels.len()));
    }

    fn upload_grid(&mut self, id: u32, grid: &GridHandle) {
        self.grid_uploads.push((id, grid.name().to_owned()));
    }
}
