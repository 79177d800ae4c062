//! Error types for coverage runs and path resolution

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the resolution utilities and the coverage orchestrator.
#[derive(Debug, Error)]
pub enum CovxError {
    /// A required argument was missing, empty or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A required file or directory does not exist.
    #[error("{what} not found: {}", path.display())]
    NotFound { what: String, path: PathBuf },

    /// An external process exited unsuccessfully.
    #[error("{tool} failed with {}", describe_exit(*code))]
    ExternalToolFailure { tool: String, code: Option<i32> },

    /// Coverage totals fell below a configured threshold.
    #[error("Coverage below threshold: {0}")]
    ThresholdNotMet(String),

    /// A tool's output could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl CovxError {
    pub fn not_found(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what: what.into(),
            path: path.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) | Self::Config(_) => 2,
            Self::NotFound { .. } => 3,
            Self::ExternalToolFailure { .. } => 4,
            Self::ThresholdNotMet(_) => 5,
            Self::Parse(_) | Self::Io { .. } => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CovxError>;
