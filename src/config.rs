use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifacts::{SelectionPolicy, COVERAGE_PATTERN};
use crate::error::{CovxError, Result};
use crate::versions::VersionOrdering;

pub const CONFIG_FILE: &str = "covx.toml";

/// Package ids the run depends on
pub const CODE_COVERAGE_PACKAGE: &str = "Microsoft.CodeCoverage";
pub const REPORT_GENERATOR_PACKAGE: &str = "ReportGenerator";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub packages: Packages,
    #[serde(default)]
    pub tools: Tools,
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub thresholds: Thresholds,
}

#[derive(Debug, Default, Deserialize)]
pub struct Packages {
    /// Package cache root; `~` and `$VARS` are expanded
    #[serde(default)]
    pub cache_root: Option<String>,
    #[serde(default)]
    pub ordering: VersionOrdering,
}

#[derive(Debug, Deserialize)]
pub struct Tools {
    #[serde(default = "default_dotnet")]
    pub dotnet: String,
    /// File-name glob of the coverage converter inside the Microsoft.CodeCoverage package
    #[serde(default = "default_converter")]
    pub converter: String,
    /// File-name glob of the report generator assembly, run through `dotnet`
    #[serde(default = "default_report_generator")]
    pub report_generator: String,
}

#[derive(Debug, Deserialize)]
pub struct RunSettings {
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
    #[serde(default = "default_report_types")]
    pub report_types: Vec<String>,
    #[serde(default = "default_artifact_pattern")]
    pub artifact_pattern: String,
    #[serde(default)]
    pub artifact_policy: SelectionPolicy,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Thresholds {
    #[serde(default)]
    pub line: Option<f64>,
    #[serde(default)]
    pub branch: Option<f64>,
}

fn default_dotnet() -> String {
    "dotnet".to_string()
}

fn default_converter() -> String {
    if cfg!(windows) {
        "CodeCoverage.exe".to_string()
    } else {
        "CodeCoverage".to_string()
    }
}

fn default_report_generator() -> String {
    "ReportGenerator.dll".to_string()
}

fn default_results_dir() -> String {
    "TestResults".to_string()
}

fn default_report_dir() -> String {
    "coveragereport".to_string()
}

fn default_report_types() -> Vec<String> {
    vec!["Html".to_string(), "Cobertura".to_string()]
}

fn default_artifact_pattern() -> String {
    COVERAGE_PATTERN.to_string()
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            dotnet: default_dotnet(),
            converter: default_converter(),
            report_generator: default_report_generator(),
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            report_dir: default_report_dir(),
            report_types: default_report_types(),
            artifact_pattern: default_artifact_pattern(),
            artifact_policy: SelectionPolicy::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CovxError::io(path, e))?;
        Self::parse(&content)
    }

    /// Load `path` when given, otherwise `covx.toml` in `base_dir` if present, otherwise defaults.
    pub fn discover(path: Option<&Path>, base_dir: &Path) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(CovxError::not_found("Config file", path));
            }
            return Self::load(path);
        }

        let default_path = base_dir.join(CONFIG_FILE);
        if default_path.exists() {
            Self::load(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| CovxError::Config(format!("Failed to parse {}: {}", CONFIG_FILE, e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [("line", self.thresholds.line), ("branch", self.thresholds.branch)] {
            if let Some(value) = value {
                if !(0.0..=100.0).contains(&value) {
                    return Err(CovxError::Config(format!(
                        "{} threshold must be between 0 and 100, got {}",
                        name, value
                    )));
                }
            }
        }

        if self.run.report_types.is_empty() {
            return Err(CovxError::Config("report_types must not be empty".to_string()));
        }

        if self.run.artifact_pattern.trim().is_empty() {
            return Err(CovxError::Config("artifact_pattern must not be empty".to_string()));
        }

        Ok(())
    }

    /// Package cache root from config, with `~`/`$VAR` expansion.
    pub fn cache_root(&self) -> Result<Option<PathBuf>> {
        let Some(ref raw) = self.packages.cache_root else {
            return Ok(None);
        };

        let expanded = shellexpand::full(raw)
            .map_err(|e| CovxError::Config(format!("cannot expand cache_root '{}': {}", raw, e)))?;

        Ok(Some(PathBuf::from(expanded.into_owned())))
    }

    pub fn wants_cobertura(&self) -> bool {
        self.run
            .report_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case("cobertura"))
    }
}
