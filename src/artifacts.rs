//! Test run artifact lookup
//!
//! Finds files produced by external tools (coverage results, tool payloads)
//! by file-name glob under a search root.

use chrono::{DateTime, Local};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{CovxError, Result};

/// Default pattern for binary coverage results written by the test runner
pub const COVERAGE_PATTERN: &str = "*.coverage";

/// How the "most recent" match is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Newest last-modified time wins
    #[default]
    Modified,
    /// First match in traversal order
    Traversal,
}

/// A file matching the search pattern
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactCandidate {
    pub path: PathBuf,
    pub modified: DateTime<Local>,
}

/// Return every file under `search_root` whose name matches `pattern`.
///
/// Directories are walked sorted by file name, so the order is stable for an
/// unchanged tree.
pub fn find_all(search_root: &Path, pattern: &str, recursive: bool) -> Result<Vec<ArtifactCandidate>> {
    let matcher = Pattern::new(pattern)
        .map_err(|e| CovxError::InvalidArgument(format!("invalid pattern '{}': {}", pattern, e)))?;

    if !search_root.is_dir() {
        return Err(CovxError::not_found("Search directory", search_root));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut candidates = Vec::new();

    for entry in WalkDir::new(search_root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(search_root).to_path_buf();
            CovxError::io(path, e.into())
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        if !matcher.matches(&entry.file_name().to_string_lossy()) {
            continue;
        }

        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        candidates.push(ArtifactCandidate {
            path: entry.into_path(),
            modified: DateTime::<Local>::from(modified),
        });
    }

    Ok(candidates)
}

/// Return the most recent file under `search_root` matching `pattern`.
pub fn find_most_recent(
    search_root: &Path,
    pattern: &str,
    recursive: bool,
    policy: SelectionPolicy,
) -> Result<PathBuf> {
    let candidates = find_all(search_root, pattern, recursive)?;

    let chosen = match policy {
        SelectionPolicy::Traversal => candidates.into_iter().next(),
        // max_by_key keeps the last of equal elements, so ties go to the later path.
        SelectionPolicy::Modified => candidates.into_iter().max_by_key(|c| c.modified),
    };

    let chosen = chosen.ok_or_else(|| {
        CovxError::not_found(format!("File matching '{}'", pattern), search_root)
    })?;

    debug!(path = %chosen.path.display(), ?policy, "selected artifact");
    Ok(chosen.path)
}
