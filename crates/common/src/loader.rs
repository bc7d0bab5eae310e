use std::path::{Path, PathBuf};

/// Errors reported by external file loaders (image codecs, sparse-grid readers).
///
/// The scene layer never decodes files itself; loaders hand back in-memory
/// payloads or one of these errors.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("file does not exist: {0}")]
    Missing(PathBuf),
    #[error("unsupported format: {extension}")]
    UnsupportedFormat { extension: String },
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lower-cased extension of `path`, including the leading dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(
            extension_of(Path::new("smoke/Cloud.NVDB")).as_deref(),
            Some(".nvdb")
        );
        assert_eq!(extension_of(Path::new("no_extension")), None);
    }
}
