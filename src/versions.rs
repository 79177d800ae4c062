//! Installed package version lookup
//!
//! The package cache keeps one directory per installed version:
//! `<cache_root>/<package-id>/<version>/...`. This module picks the latest
//! of those directories and finds tool payloads inside it.

use serde::Deserialize;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::artifacts::{find_most_recent, SelectionPolicy};
use crate::error::{CovxError, Result};

/// How version directory names are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum VersionOrdering {
    /// Plain string comparison. "1.9.0" sorts after "1.10.0".
    Lexical,
    /// Numeric comparison of dotted components with pre-release awareness.
    #[default]
    Semver,
}

impl VersionOrdering {
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            Self::Lexical => a.cmp(b),
            Self::Semver => compare_versions(a, b),
        }
    }
}

/// Directory of a package inside the cache. Package ids are stored lower-cased.
pub fn package_dir(cache_root: &Path, package_id: &str) -> PathBuf {
    cache_root.join(package_id.to_lowercase())
}

/// Return the latest version directory under `package_root`.
pub fn latest_version_dir(package_root: &Path, ordering: VersionOrdering) -> Result<PathBuf> {
    if !package_root.is_dir() {
        return Err(CovxError::not_found("Package directory", package_root));
    }

    let entries = fs::read_dir(package_root).map_err(|e| CovxError::io(package_root, e))?;

    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CovxError::io(package_root, e))?;
        if entry.path().is_dir() {
            versions.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    versions.sort_by(|a, b| ordering.compare(a, b));

    let latest = versions
        .pop()
        .ok_or_else(|| CovxError::not_found("Installed version", package_root))?;

    debug!(package = %package_root.display(), version = %latest, ?ordering, "latest version");
    Ok(package_root.join(latest))
}

/// Locate a tool file inside the latest installed version of a package.
pub fn locate_tool(package_root: &Path, ordering: VersionOrdering, tool_pattern: &str) -> Result<PathBuf> {
    let version_dir = latest_version_dir(package_root, ordering)?;
    find_most_recent(&version_dir, tool_pattern, true, SelectionPolicy::Traversal)
}

/// Compare two version strings numerically.
///
/// `1.10.0` > `1.9.0`, `2.0` == `2.0.0`, and `1.0.0-preview.1` < `1.0.0`.
/// Components that are not numbers are compared as strings. Equal versions
/// spelled differently fall back to string order so the result is total.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a_core, a_pre) = split_prerelease(a);
    let (b_core, b_pre) = split_prerelease(b);

    let a_parts: Vec<&str> = a_core.split('.').collect();
    let b_parts: Vec<&str> = b_core.split('.').collect();
    let len = a_parts.len().max(b_parts.len());

    for i in 0..len {
        let x = a_parts.get(i).copied().unwrap_or("0");
        let y = b_parts.get(i).copied().unwrap_or("0");
        let ord = compare_component(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    let pre = match (a_pre, b_pre) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(x), Some(y)) => compare_prerelease(x, y),
    };

    pre.then_with(|| a.cmp(b))
}

fn split_prerelease(version: &str) -> (&str, Option<&str>) {
    // Build metadata never affects precedence.
    let version = version.split('+').next().unwrap_or(version);
    match version.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (version, None),
    }
}

fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let a_parts: Vec<&str> = a.split('.').collect();
    let b_parts: Vec<&str> = b.split('.').collect();

    for (x, y) in a_parts.iter().zip(b_parts.iter()) {
        let ord = compare_component(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    a_parts.len().cmp(&b_parts.len())
}

fn compare_component(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        // Numeric identifiers rank below alphanumeric ones.
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn package_with_versions(versions: &[&str]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for version in versions {
            fs::create_dir_all(temp_dir.path().join(version)).unwrap();
        }
        temp_dir
    }

    #[test]
    fn test_lexical_picks_last_name() {
        let root = package_with_versions(&["1.0.0", "1.2.0", "2.0.0"]);
        let latest = latest_version_dir(root.path(), VersionOrdering::Lexical).unwrap();
        assert_eq!(latest, root.path().join("2.0.0"));
    }

    #[test]
    fn test_lexical_ordering_misorders_unpadded_versions() {
        // Known limitation of lexical ordering: "1.9.0" > "1.10.0" as strings.
        let root = package_with_versions(&["1.9.0", "1.10.0"]);
        let latest = latest_version_dir(root.path(), VersionOrdering::Lexical).unwrap();
        assert_eq!(latest, root.path().join("1.9.0"));
    }

    #[test]
    fn test_semver_orders_numerically() {
        let root = package_with_versions(&["1.9.0", "1.10.0"]);
        let latest = latest_version_dir(root.path(), VersionOrdering::Semver).unwrap();
        assert_eq!(latest, root.path().join("1.10.0"));
    }

    #[test]
    fn test_codecoverage_cache_layout() {
        let cache = TempDir::new().unwrap();
        let package = package_dir(cache.path(), "Microsoft.CodeCoverage");
        fs::create_dir_all(package.join("9.1.0")).unwrap();
        fs::create_dir_all(package.join("10.0.0")).unwrap();

        assert_eq!(package, cache.path().join("microsoft.codecoverage"));

        let lexical = latest_version_dir(&package, VersionOrdering::Lexical).unwrap();
        assert_eq!(lexical, package.join("9.1.0"));

        let semver = latest_version_dir(&package, VersionOrdering::Semver).unwrap();
        assert_eq!(semver, package.join("10.0.0"));
    }

    #[test]
    fn test_default_ordering_is_semver() {
        assert_eq!(VersionOrdering::default(), VersionOrdering::Semver);
    }

    #[test]
    fn test_files_are_not_versions() {
        let root = package_with_versions(&["1.0.0"]);
        fs::write(root.path().join("9.9.9"), "not a directory").unwrap();
        let latest = latest_version_dir(root.path(), VersionOrdering::Lexical).unwrap();
        assert_eq!(latest, root.path().join("1.0.0"));
    }

    #[test]
    fn test_empty_root_is_not_found() {
        let root = package_with_versions(&[]);
        let err = latest_version_dir(root.path(), VersionOrdering::Semver).unwrap_err();
        assert!(matches!(err, CovxError::NotFound { .. }));
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("reportgenerator");
        let err = latest_version_dir(&missing, VersionOrdering::Lexical).unwrap_err();
        assert!(matches!(err, CovxError::NotFound { .. }));
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "2.0.0"), Ordering::Less);
        assert_eq!(compare_versions("17.8.0-preview.1", "17.8.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0-beta.2", "1.0.0-beta.10"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0-alpha", "1.0.0-alpha.1"), Ordering::Less);
        assert_eq!(compare_versions("5.2.0+build.7", "5.2.0"), Ordering::Greater);
        assert_eq!(compare_versions("5.3.0", "5.3.0"), Ordering::Equal);
    }

    #[test]
    fn test_prerelease_is_older_than_release_directory() {
        let root = package_with_versions(&["5.3.0-rc.1", "5.3.0", "5.2.9"]);
        let latest = latest_version_dir(root.path(), VersionOrdering::Semver).unwrap();
        assert_eq!(latest, root.path().join("5.3.0"));
    }

    #[test]
    fn test_locate_tool_searches_latest_version() {
        let root = package_with_versions(&["5.1.0", "5.4.1"]);
        let old = root.path().join("5.1.0/tools/net6.0");
        let new = root.path().join("5.4.1/tools/net8.0");
        fs::create_dir_all(&old).unwrap();
        fs::create_dir_all(&new).unwrap();
        fs::write(old.join("ReportGenerator.dll"), "").unwrap();
        fs::write(new.join("ReportGenerator.dll"), "").unwrap();

        let tool = locate_tool(root.path(), VersionOrdering::Semver, "ReportGenerator.dll").unwrap();
        assert_eq!(tool, new.join("ReportGenerator.dll"));
    }

    #[test]
    fn test_locate_tool_missing_payload() {
        let root = package_with_versions(&["5.4.1"]);
        let err = locate_tool(root.path(), VersionOrdering::Semver, "ReportGenerator.dll").unwrap_err();
        assert!(matches!(err, CovxError::NotFound { .. }));
    }
}
