use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use prism_common::{Aabb, ComponentKind, LoadError, extension_of};
use prism_registry::{Component, ComponentMeta, Handle, Registry, RegistryError};
use std::path::Path;
use std::sync::Arc;

/// Sparse-grid tree depth: leaves are level 0, the root is level 3.
pub const GRID_LEVELS: u32 = 4;

/// Value type stored in a sparse grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridType {
    Float,
    Double,
    Int16,
    Int32,
    Int64,
    Vec3f,
    Vec3d,
    Mask,
    Fp16,
    UInt32,
    Unknown,
}

impl GridType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Double => "double",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Vec3f => "vec3f",
            Self::Vec3d => "vec3d",
            Self::Mask => "mask",
            Self::Fp16 => "fp16",
            Self::UInt32 => "uint32",
            Self::Unknown => "unknown",
        }
    }

    fn code(self) -> u32 {
        self as u32
    }
}

impl std::fmt::Display for GridType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An in-memory sparse voxel grid handed over by a [`GridLoader`].
///
/// The grid payload is opaque to the scene layer; only the tree's node
/// bounds are exposed for queries. Cloning shares the payload.
#[derive(Debug, Clone)]
pub struct GridHandle {
    name: String,
    grid_type: GridType,
    /// Node bounds per tree level, index 0 holding the leaves.
    levels: Vec<Vec<Aabb>>,
    data: Arc<[u8]>,
}

impl GridHandle {
    pub fn new(
        name: impl Into<String>,
        grid_type: GridType,
        levels: Vec<Vec<Aabb>>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            grid_type,
            levels,
            data: data.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid_type(&self) -> GridType {
        self.grid_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn levels(&self) -> &[Vec<Aabb>] {
        &self.levels
    }

    fn is_empty(&self) -> bool {
        self.levels.iter().all(Vec::is_empty)
    }

    /// Bounds of the whole grid: the union of its top-most non-empty level.
    pub fn bounds(&self) -> Option<Aabb> {
        let top = self.levels.iter().rev().find(|level| !level.is_empty())?;
        top.iter().copied().reduce(|a, b| Aabb::new(a.min.min(b.min), a.max.max(b.max)))
    }
}

/// External sparse-grid reader (NanoVDB).
pub trait GridLoader {
    fn load(&self, path: &Path) -> Result<GridHandle, LoadError>;
}

#[derive(Debug, thiserror::Error)]
pub enum VolumeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("volume has no grid")]
    NoGrid,
    #[error("grid contains no nodes")]
    EmptyGrid,
    #[error("unsupported grid format: {0}")]
    UnsupportedGrid(GridType),
    #[error("tree level {level} out of range")]
    LevelOutOfRange { level: u32 },
    #[error("node {node} out of range at level {level} ({count} nodes)")]
    NodeOutOfRange { level: u32, node: u32, count: u32 },
}

/// A sparse voxel grid scattering and absorbing light, e.g. smoke or clouds.
#[derive(Debug, Clone)]
pub struct Volume {
    meta: ComponentMeta,
    grid: Option<GridHandle>,
    scale: f32,
    gradient_factor: f32,
    absorption: f32,
    scattering: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VolumeStruct {
    pub bbox_min: [f32; 3],
    pub scale: f32,
    pub bbox_max: [f32; 3],
    pub gradient_factor: f32,
    pub absorption: f32,
    pub scattering: f32,
    pub grid_type: u32,
    pub has_grid: u32,
}

const SUPPORTED_EXTENSION: &str = ".nvdb";

impl Volume {
    pub fn create(volumes: &Registry<Volume>, name: &str) -> Result<Handle<Volume>, RegistryError> {
        volumes.create(name)
    }

    /// Load a `.nvdb` file with `loader` and create a volume around it.
    ///
    /// The file is read before the registry lock is taken. No record is left
    /// behind on any failure.
    pub fn create_from_file(
        volumes: &Registry<Volume>,
        name: &str,
        path: impl AsRef<Path>,
        loader: &dyn GridLoader,
    ) -> Result<Handle<Volume>, VolumeError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::Missing(path.to_path_buf()).into());
        }
        match extension_of(path) {
            Some(ext) if ext == SUPPORTED_EXTENSION => {}
            other => {
                return Err(LoadError::UnsupportedFormat {
                    extension: other.unwrap_or_default(),
                }
                .into());
            }
        }
        let grid = loader.load(path)?;
        tracing::debug!(name, path = %path.display(), grid_type = %grid.grid_type(), "grid loaded");
        Self::create_from_grid(volumes, name, grid)
    }

    /// Create a volume from an already loaded grid.
    pub fn create_from_grid(
        volumes: &Registry<Volume>,
        name: &str,
        grid: GridHandle,
    ) -> Result<Handle<Volume>, VolumeError> {
        volumes.create_with(name, |volume| volume.set_grid(grid))
    }

    /// Attach a grid. Grids without any nodes are rejected.
    pub fn set_grid(&mut self, grid: GridHandle) -> Result<(), VolumeError> {
        if grid.is_empty() {
            return Err(VolumeError::EmptyGrid);
        }
        self.grid = Some(grid);
        self.meta.mark_dirty();
        Ok(())
    }

    pub fn grid(&self) -> Option<&GridHandle> {
        self.grid.as_ref()
    }

    /// Value type of the attached grid, or [`GridType::Unknown`] without one.
    pub fn grid_type(&self) -> GridType {
        self.grid.as_ref().map_or(GridType::Unknown, GridHandle::grid_type)
    }

    fn float_grid(&self) -> Result<&GridHandle, VolumeError> {
        let grid = self.grid.as_ref().ok_or(VolumeError::NoGrid)?;
        if grid.grid_type() != GridType::Float {
            return Err(VolumeError::UnsupportedGrid(grid.grid_type()));
        }
        Ok(grid)
    }

    /// Number of tree nodes at `level`. Float grids only.
    pub fn node_count(&self, level: u32) -> Result<u32, VolumeError> {
        let grid = self.float_grid()?;
        if level >= GRID_LEVELS {
            return Err(VolumeError::LevelOutOfRange { level });
        }
        Ok(grid
            .levels
            .get(level as usize)
            .map_or(0, |nodes| nodes.len() as u32))
    }

    fn node_bounds(&self, level: u32, node: u32) -> Result<Aabb, VolumeError> {
        let count = self.node_count(level)?;
        self.float_grid()?
            .levels
            .get(level as usize)
            .and_then(|nodes| nodes.get(node as usize))
            .copied()
            .ok_or(VolumeError::NodeOutOfRange { level, node, count })
    }

    pub fn min_aabb_corner(&self, level: u32, node: u32) -> Result<Vec3, VolumeError> {
        self.node_bounds(level, node).map(|b| b.min)
    }

    pub fn max_aabb_corner(&self, level: u32, node: u32) -> Result<Vec3, VolumeError> {
        self.node_bounds(level, node).map(|b| b.max)
    }

    pub fn aabb_center(&self, level: u32, node: u32) -> Result<Vec3, VolumeError> {
        self.node_bounds(level, node).map(|b| b.center())
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// World-space size of one voxel.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
        self.meta.mark_dirty();
    }

    pub fn gradient_factor(&self) -> f32 {
        self.gradient_factor
    }

    /// Blend between volumetric (0) and surface-like (1) shading, driven by
    /// the density gradient.
    pub fn set_gradient_factor(&mut self, factor: f32) {
        self.gradient_factor = factor;
        self.meta.mark_dirty();
    }

    pub fn absorption(&self) -> f32 {
        self.absorption
    }

    pub fn set_absorption(&mut self, absorption: f32) {
        self.absorption = absorption;
        self.meta.mark_dirty();
    }

    pub fn scattering(&self) -> f32 {
        self.scattering
    }

    pub fn set_scattering(&mut self, scattering: f32) {
        self.scattering = scattering;
        self.meta.mark_dirty();
    }
}

impl Component for Volume {
    const KIND: ComponentKind = ComponentKind::Volume;
    type Struct = VolumeStruct;

    fn with_meta(meta: ComponentMeta) -> Self {
        Self {
            meta,
            grid: None,
            scale: 1.0,
            gradient_factor: 0.5,
            absorption: 0.5,
            scattering: 0.5,
        }
    }

    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }

    fn to_struct(&self) -> VolumeStruct {
        let bounds = self
            .grid
            .as_ref()
            .and_then(GridHandle::bounds)
            .unwrap_or_default();
        VolumeStruct {
            bbox_min: bounds.min.to_array(),
            scale: self.scale,
            bbox_max: bounds.max.to_array(),
            gradient_factor: self.gradient_factor,
            absorption: self.absorption,
            scattering: self.scattering,
            grid_type: self.grid_type().code(),
            has_grid: self.grid.is_some() as u32,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Volume",
            "name": self.name(),
            "id": self.id(),
            "grid_type": self.grid_type().as_str(),
            "scale": self.scale,
            "gradient_factor": self.gradient_factor,
            "absorption": self.absorption,
            "scattering": self.scattering,
        })
    }
}
