//! Caller-side checks performed before handing bytes to a decoder: the
//! file-extension dispatch and the upload size limit.

use std::ops::ControlFlow;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::dataset::{Dataset, SceneFormat};
use crate::error::ParseError;
use crate::options::{keep_going, Checkpoint, ParseOptions};
use crate::ply::parse_ply_core_with_opts;
use crate::splat::parse_splat_core_with_opts;

pub const DEFAULT_MAX_FILE_SIZE: usize = 100 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file \"{0}\": please upload a .ply or .splat file")]
    UnsupportedExtension(String),

    #[error("file is too large ({size} bytes, limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_size: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl SceneFormat {
    /// Picks a decoder from the file extension, ignoring case.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ply" => Some(SceneFormat::Ply),
            "splat" => Some(SceneFormat::Splat),
            _ => None,
        }
    }
}

pub fn check_upload(file_name: &str, file_size: usize, limits: &UploadLimits) -> Result<SceneFormat, LoadError> {
    let format = SceneFormat::from_file_name(file_name)
        .ok_or_else(|| LoadError::UnsupportedExtension(file_name.to_string()))?;
    if file_size > limits.max_file_size {
        return Err(LoadError::TooLarge {
            size: file_size,
            limit: limits.max_file_size,
        });
    }
    Ok(format)
}

pub fn load_scene(bytes: &[u8], file_name: &str) -> Result<Dataset, LoadError> {
    load_scene_with_opts(bytes, file_name, &UploadLimits::default(), &ParseOptions::default(), &mut keep_going)
}

pub fn load_scene_with_opts<F>(
    bytes: &[u8],
    file_name: &str,
    limits: &UploadLimits,
    opts: &ParseOptions,
    on_checkpoint: &mut F,
) -> Result<Dataset, LoadError>
where
    F: FnMut(&Checkpoint) -> ControlFlow<()>,
{
    let format = check_upload(file_name, bytes.len(), limits)?;
    debug!(file = file_name, format = format.as_str(), size = bytes.len(), "dispatching upload");
    let dataset = match format {
        SceneFormat::Ply => parse_ply_core_with_opts(bytes, file_name, bytes.len(), opts, on_checkpoint)?,
        SceneFormat::Splat => parse_splat_core_with_opts(bytes, file_name, bytes.len(), opts, on_checkpoint)?,
    };
    Ok(dataset)
}

/// Reads a file from disk and runs it through [`load_scene_with_opts`].
/// The size limit is checked against file metadata before reading.
pub fn load_scene_file<F>(
    path: &Path,
    limits: &UploadLimits,
    opts: &ParseOptions,
    on_checkpoint: &mut F,
) -> Result<Dataset, LoadError>
where
    F: FnMut(&Checkpoint) -> ControlFlow<()>,
{
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let size = usize::try_from(std::fs::metadata(path)?.len()).unwrap_or(usize::MAX);
    check_upload(&file_name, size, limits)?;
    let bytes = std::fs::read(path)?;
    load_scene_with_opts(&bytes, &file_name, limits, opts, on_checkpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;

    #[test]
    fn test_extension_dispatch() {
        assert_eq!(SceneFormat::from_file_name("scan.PLY"), Some(SceneFormat::Ply));
        assert_eq!(SceneFormat::from_file_name("dir/garden.splat"), Some(SceneFormat::Splat));
        assert_eq!(SceneFormat::from_file_name("notes.txt"), None);
        assert_eq!(SceneFormat::from_file_name("ply"), None);
    }

    #[test]
    fn test_size_limit() {
        let limits = UploadLimits { max_file_size: 10 };
        assert!(matches!(check_upload("a.ply", 10, &limits), Ok(SceneFormat::Ply)));
        assert!(matches!(
            check_upload("a.ply", 11, &limits),
            Err(LoadError::TooLarge { size: 11, limit: 10 })
        ));
    }

    #[test]
    fn test_unsupported_extension_message() {
        let err = load_scene(b"whatever", "mesh.obj").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported file \"mesh.obj\": please upload a .ply or .splat file"
        );
    }

    #[test]
    fn test_load_dispatches_by_extension() {
        let text = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n1 2 3\n";
        let ds = load_scene(text.as_bytes(), "one.ply").unwrap();
        assert_eq!(ds.metadata().format, SceneFormat::Ply);
        assert_eq!(ds.metadata().file_size, text.len());

        let err = load_scene(&[0u8; 32], "zeros.ply").unwrap_err();
        assert!(matches!(
            err,
            LoadError::Parse(ParseError::Format(FormatError::MissingSignature))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_scene_file(
            Path::new("/nonexistent/dir/scene.ply"),
            &UploadLimits::default(),
            &ParseOptions::default(),
            &mut keep_going,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
