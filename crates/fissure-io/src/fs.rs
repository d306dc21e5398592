//! Filesystem helpers: image discovery, reads, and writes.

use std::path::{Path, PathBuf};

use fissure_pipeline::ImageFormat;
use fissure_pipeline::codec;

use crate::error::IoError;

/// Returns `true` if `path` has one of the supported image extensions
/// (case-insensitive).
#[must_use]
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(codec::is_supported_extension)
}

/// List the image files directly inside `dir`.
///
/// Only regular files with a supported extension are returned;
/// subdirectories are not descended into. The result is sorted by file
/// name so runs are reproducible.
///
/// # Errors
///
/// Returns [`IoError::Io`] if the directory cannot be read.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    let entries = std::fs::read_dir(dir).map_err(|e| IoError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| IoError::io(dir, e))?.path();
        if path.is_file() && has_image_extension(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Create `parent/name` if needed and return its path.
///
/// # Errors
///
/// Returns [`IoError::Io`] if the directory cannot be created.
pub fn ensure_dir(parent: &Path, name: &str) -> Result<PathBuf, IoError> {
    let dir = parent.join(name);
    std::fs::create_dir_all(&dir).map_err(|e| IoError::io(&dir, e))?;
    Ok(dir)
}

/// Read a whole file.
///
/// # Errors
///
/// Returns [`IoError::Io`] on any read failure.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>, IoError> {
    std::fs::read(path).map_err(|e| IoError::io(path, e))
}

/// Write `bytes` to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`IoError::Io`] on any write failure.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), IoError> {
    std::fs::write(path, bytes).map_err(|e| IoError::io(path, e))
}

/// Encoding implied by the extension of `path`.
///
/// # Errors
///
/// Returns [`IoError::Pipeline`] wrapping
/// [`PipelineError::UnsupportedFormat`](fissure_pipeline::PipelineError::UnsupportedFormat)
/// when the extension is missing or unsupported.
pub fn format_for_path(path: &Path) -> Result<ImageFormat, IoError> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    Ok(codec::format_for_extension(ext)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use fissure_pipeline::PipelineError;
    use tempfile::tempdir;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_image_extension(Path::new("a/b/photo.JPG")));
        assert!(has_image_extension(Path::new("scan.Tiff")));
        assert!(!has_image_extension(Path::new("notes.txt")));
        assert!(!has_image_extension(Path::new("png")));
    }

    #[test]
    fn list_images_filters_sorts_and_skips_directories() {
        let dir = tempdir().unwrap();
        for name in ["b.png", "a.JPEG", "c.txt", "d.bmp"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();
        std::fs::write(dir.path().join("nested.png").join("e.png"), b"x").unwrap();

        let names: Vec<String> = list_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.JPEG", "b.png", "d.bmp"]);
    }

    #[test]
    fn list_images_reports_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent");
        let err = list_images(&missing).unwrap_err();
        assert!(matches!(err, IoError::Io { ref path, .. } if *path == missing));
    }

    #[test]
    fn ensure_dir_is_idempotent() {
        let dir = tempdir().unwrap();
        let first = ensure_dir(dir.path(), "labeled_images").unwrap();
        let second = ensure_dir(dir.path(), "labeled_images").unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(format_for_path(Path::new("x.jpeg")).unwrap(), ImageFormat::Jpeg);
        assert_eq!(format_for_path(Path::new("x.TIF")).unwrap(), ImageFormat::Tiff);
        assert!(matches!(
            format_for_path(Path::new("x.gif")),
            Err(IoError::Pipeline(PipelineError::UnsupportedFormat(_)))
        ));
        assert!(format_for_path(Path::new("noext")).is_err());
    }
}
