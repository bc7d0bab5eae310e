use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use prism_common::{ComponentKind, LoadError};
use prism_registry::{Component, ComponentMeta, Handle, Registry, RegistryError};
use std::path::Path;

/// Errors from texture construction.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("texel count mismatch: {width}x{height} needs {expected}, got {actual}")]
    DataSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Decoded RGBA image handed over by an [`ImageLoader`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Row-major texels.
    pub texels: Vec<Vec4>,
}

/// External image decoder (PNG, JPEG, HDR, ...).
pub trait ImageLoader {
    fn load(&self, path: &Path) -> Result<DecodedImage, LoadError>;
}

/// A 2D pattern of RGBA texels used to drive material and light parameters.
#[derive(Debug, Clone)]
pub struct Texture {
    meta: ComponentMeta,
    width: u32,
    height: u32,
    texels: Vec<Vec4>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextureStruct {
    pub width: u32,
    pub height: u32,
    pub texel_count: u32,
    pub initialized: u32,
}

impl Texture {
    /// Create an empty (0x0) texture.
    pub fn create(
        textures: &Registry<Texture>,
        name: &str,
    ) -> Result<Handle<Texture>, RegistryError> {
        textures.create(name)
    }

    /// Create a texture from row-major RGBA texels. Fails, leaving no record
    /// behind, when `texels.len() != width * height`.
    pub fn create_from_data(
        textures: &Registry<Texture>,
        name: &str,
        width: u32,
        height: u32,
        texels: Vec<Vec4>,
    ) -> Result<Handle<Texture>, TextureError> {
        textures.create_with(name, |texture| texture.set_data(width, height, texels))
    }

    /// Decode `path` with `loader`, then create the texture from its texels.
    ///
    /// Decoding happens before the registry lock is taken.
    pub fn create_from_image(
        textures: &Registry<Texture>,
        name: &str,
        path: impl AsRef<Path>,
        loader: &dyn ImageLoader,
    ) -> Result<Handle<Texture>, TextureError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::Missing(path.to_path_buf()).into());
        }
        let image = loader.load(path)?;
        tracing::debug!(name, path = %path.display(), width = image.width, height = image.height, "image decoded");
        Self::create_from_data(textures, name, image.width, image.height, image.texels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    pub fn texel(&self, x: u32, y: u32) -> Option<Vec4> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.texels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Replace the texel data.
    pub fn set_data(&mut self, width: u32, height: u32, texels: Vec<Vec4>) -> Result<(), TextureError> {
        let expected = width as usize * height as usize;
        if texels.len() != expected {
            return Err(TextureError::DataSizeMismatch {
                width,
                height,
                expected,
                actual: texels.len(),
            });
        }
        self.width = width;
        self.height = height;
        self.texels = texels;
        self.meta.mark_dirty();
        Ok(())
    }
}

impl Component for Texture {
    const KIND: ComponentKind = ComponentKind::Texture;
    type Struct = TextureStruct;

    fn with_meta(meta: ComponentMeta) -> Self {
        Self {
            meta,
            width: 0,
            height: 0,
            texels: Vec::new(),
        }
    }

    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }

    fn to_struct(&self) -> TextureStruct {
        TextureStruct {
            width: self.width,
            height: self.height,
            texel_count: self.texels.len() as u32,
            initialized: 1,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Texture",
            "name": self.name(),
            "id": self.id(),
            "width": self.width,
            "height": self.height,
        })
    }
}
