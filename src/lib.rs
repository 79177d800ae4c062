//! covx - .NET test coverage runner
//!
//! A library and CLI for running .NET unit tests with code coverage:
//! - Path resolution against an explicit base directory
//! - Latest installed package version lookup (lexical or semver ordering)
//! - Most recent test artifact lookup (by timestamp or traversal order)
//! - Orchestration of `dotnet test`, the coverage converter and the report generator
//! - Cobertura summary parsing and coverage thresholds

pub mod artifacts;
pub mod config;
pub mod coverage;
pub mod error;
pub mod orchestrator;
pub mod packages;
pub mod paths;
pub mod process;
pub mod report;
pub mod versions;
pub mod viewer;

pub use artifacts::{find_all, find_most_recent, ArtifactCandidate, SelectionPolicy};
pub use config::Config;
pub use error::{CovxError, Result};
pub use orchestrator::{CoverageRun, RunRequest, RunSummary};
pub use paths::resolve;
pub use process::{ProcessRunner, SystemProcessRunner, ToolCommand};
pub use versions::{latest_version_dir, VersionOrdering};
pub use viewer::{SystemViewer, Viewer};
