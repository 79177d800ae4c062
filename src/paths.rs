//! Path resolution against an explicit base directory

use std::path::{Path, PathBuf};

use crate::error::{CovxError, Result};

/// Resolve `path` to an absolute path.
///
/// Absolute inputs are returned with their separators normalized for the
/// host; relative inputs are joined onto `base_dir`. Nothing is checked on
/// disk, see [`require_exists`] for that.
pub fn resolve(path: impl AsRef<Path>, base_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let base_dir = base_dir.as_ref();

    if path.as_os_str().is_empty() {
        return Err(CovxError::InvalidArgument("path must not be empty".to_string()));
    }

    if path.is_absolute() {
        return Ok(normalize(path));
    }

    if !base_dir.is_absolute() {
        return Err(CovxError::InvalidArgument(format!(
            "base directory must be absolute: {}",
            base_dir.display()
        )));
    }

    Ok(base_dir.join(path))
}

/// Rebuild a path from its components, dropping repeated separators and
/// `.` segments and using the host separator.
pub fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

/// Fail with `NotFound` unless `path` exists.
pub fn require_exists(path: &Path, what: &str) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(CovxError::not_found(what, path))
    }
}

/// Directory holding `path`: the path itself for directories, its parent otherwise.
pub fn containing_dir(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.to_path_buf())
    }
}
