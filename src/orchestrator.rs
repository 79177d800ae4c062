//! Coverage run orchestration
//!
//! Sequences the external tools: ensure packages, run the tests with coverage
//! collection, convert the newest coverage result to XML, render the report,
//! and optionally open it. Every step is fail-fast.

use chrono::{DateTime, Local};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::artifacts::{find_all, find_most_recent};
use crate::config::{Config, Thresholds, CODE_COVERAGE_PACKAGE, REPORT_GENERATOR_PACKAGE};
use crate::coverage::{parse_cobertura, validate_threshold, CoverageData, ThresholdResult, COBERTURA_FILE};
use crate::error::{CovxError, Result};
use crate::packages::PackageManager;
use crate::paths::{containing_dir, require_exists, resolve};
use crate::process::{run_checked, ProcessRunner, ToolCommand};
use crate::versions::{locate_tool, package_dir};
use crate::viewer::Viewer;

/// Pattern for test settings files picked up next to the project
pub const SETTINGS_PATTERN: &str = "*.runsettings";

/// Entry point of the generated HTML report
pub const REPORT_INDEX: &str = "index.html";

/// Inputs for one coverage run
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub project: PathBuf,
    pub settings: Option<PathBuf>,
    pub open_report: bool,
    pub no_build: bool,
    pub thresholds: Thresholds,
}

/// Outcome of a coverage run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub project: PathBuf,
    pub settings: Option<PathBuf>,
    pub packages_added: Vec<String>,
    pub coverage_file: PathBuf,
    pub coverage_xml: PathBuf,
    pub report_dir: PathBuf,
    pub report_index: PathBuf,
    pub coverage: Option<CoverageData>,
    pub thresholds: Option<ThresholdResult>,
    pub opened: bool,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Local>,
    pub duration_ms: u128,
}

impl RunSummary {
    pub fn thresholds_passed(&self) -> bool {
        self.thresholds.as_ref().map(|t| t.passed).unwrap_or(true)
    }
}

pub struct CoverageRun<'a> {
    config: &'a Config,
    base_dir: &'a Path,
    cache_root: &'a Path,
    runner: &'a dyn ProcessRunner,
    viewer: &'a dyn Viewer,
    quiet: bool,
}

impl<'a> CoverageRun<'a> {
    pub fn new(
        config: &'a Config,
        base_dir: &'a Path,
        cache_root: &'a Path,
        runner: &'a dyn ProcessRunner,
        viewer: &'a dyn Viewer,
    ) -> Self {
        Self {
            config,
            base_dir,
            cache_root,
            runner,
            viewer,
            quiet: false,
        }
    }

    /// Suppress progress lines and send tool output to stderr, leaving
    /// stdout to the caller
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn execute(&self, request: &RunRequest) -> Result<RunSummary> {
        let started_at = Local::now();
        let start = Instant::now();
        let mut warnings = Vec::new();

        let thresholds_set = request.thresholds.line.is_some() || request.thresholds.branch.is_some();
        if thresholds_set && !self.config.wants_cobertura() {
            return Err(CovxError::InvalidArgument(format!(
                "coverage thresholds need the Cobertura report type, got report_types = [{}]",
                self.config.run.report_types.join(", ")
            )));
        }

        let project = resolve(&request.project, self.base_dir)?;
        require_exists(&project, "Test project")?;
        let project_dir = containing_dir(&project);

        let settings = match request.settings {
            Some(ref settings) => {
                let settings = resolve(settings, self.base_dir)?;
                require_exists(&settings, "Settings file")?;
                Some(settings)
            }
            None => {
                let found = discover_settings(&project_dir)?;
                if found.is_none() {
                    let message = format!(
                        "No {} file found in {}; running tests without settings",
                        SETTINGS_PATTERN,
                        project_dir.display()
                    );
                    self.warn(&message);
                    warnings.push(message);
                }
                found
            }
        };

        self.step(&format!("Checking packages for {}", project.display()));
        let packages = PackageManager::new(self.runner, &self.config.tools.dotnet).stdout_to_stderr(self.quiet);
        let packages_added = packages.ensure(&project, &[CODE_COVERAGE_PACKAGE, REPORT_GENERATOR_PACKAGE])?;
        for package in &packages_added {
            self.detail(&format!("added {}", package));
        }

        let results_dir = resolve(&self.config.run.results_dir, &project_dir)?;
        debug!(results = %results_dir.display(), settings = ?settings, "test run inputs");
        self.step("Running tests with coverage collection");
        run_checked(self.runner, &self.test_command(&project, &project_dir, &results_dir, settings.as_deref(), request.no_build))?;

        let coverage_file = find_most_recent(
            &results_dir,
            &self.config.run.artifact_pattern,
            true,
            self.config.run.artifact_policy,
        )?;
        self.detail(&format!("coverage result: {}", coverage_file.display()));

        self.step("Converting coverage result to XML");
        let coverage_xml = coverage_file.with_extension("coveragexml");
        let converter = locate_tool(
            &package_dir(self.cache_root, CODE_COVERAGE_PACKAGE),
            self.config.packages.ordering,
            &self.config.tools.converter,
        )?;
        let convert = ToolCommand::new("coverage converter", &converter)
            .arg("analyze")
            .arg(prefixed("/output:", &coverage_xml))
            .arg(&coverage_file)
            .current_dir(&project_dir)
            .stdout_to_stderr(self.quiet);
        run_checked(self.runner, &convert)?;
        require_exists(&coverage_xml, "Converted coverage XML")?;

        self.step("Generating HTML report");
        let report_dir = resolve(&self.config.run.report_dir, &project_dir)?;
        let generator = locate_tool(
            &package_dir(self.cache_root, REPORT_GENERATOR_PACKAGE),
            self.config.packages.ordering,
            &self.config.tools.report_generator,
        )?;
        run_checked(self.runner, &self.report_command(&generator, &coverage_xml, &report_dir, &project_dir))?;

        let report_index = report_dir.join(REPORT_INDEX);
        require_exists(&report_index, "Report entry point")?;

        let coverage = if self.config.wants_cobertura() {
            let summary_path = report_dir.join(COBERTURA_FILE);
            if summary_path.exists() {
                Some(parse_cobertura(&summary_path)?)
            } else {
                let message = format!("No {} written by the report generator", summary_path.display());
                self.warn(&message);
                warnings.push(message);
                None
            }
        } else {
            None
        };

        let thresholds = if thresholds_set {
            let empty = CoverageData::default();
            Some(validate_threshold(coverage.as_ref().unwrap_or(&empty), request.thresholds))
        } else {
            None
        };

        let opened = if request.open_report {
            self.step("Opening report");
            self.viewer.open(&report_index)?;
            true
        } else {
            false
        };

        info!(report = %report_index.display(), "coverage run finished");

        Ok(RunSummary {
            project,
            settings,
            packages_added,
            coverage_file,
            coverage_xml,
            report_dir,
            report_index,
            coverage,
            thresholds,
            opened,
            warnings,
            started_at,
            duration_ms: start.elapsed().as_millis(),
        })
    }

    fn test_command(
        &self,
        project: &Path,
        project_dir: &Path,
        results_dir: &Path,
        settings: Option<&Path>,
        no_build: bool,
    ) -> ToolCommand {
        let mut cmd = ToolCommand::new("dotnet test", &self.config.tools.dotnet)
            .arg("test")
            .arg(project)
            .args(["--collect", "Code Coverage"])
            .arg("--results-directory")
            .arg(results_dir)
            .current_dir(project_dir)
            .stdout_to_stderr(self.quiet);

        if let Some(settings) = settings {
            cmd = cmd.arg("--settings").arg(settings);
        }
        if no_build {
            cmd = cmd.arg("--no-build");
        }
        cmd
    }

    fn report_command(&self, generator: &Path, coverage_xml: &Path, report_dir: &Path, project_dir: &Path) -> ToolCommand {
        // Managed assemblies go through the dotnet host, native builds run directly.
        let is_assembly = generator
            .extension()
            .map(|e| e.eq_ignore_ascii_case("dll"))
            .unwrap_or(false);

        let cmd = if is_assembly {
            ToolCommand::new("report generator", &self.config.tools.dotnet).arg(generator)
        } else {
            ToolCommand::new("report generator", generator)
        };

        cmd.arg(prefixed("-reports:", coverage_xml))
            .arg(prefixed("-targetdir:", report_dir))
            .arg(format!("-reporttypes:{}", self.config.run.report_types.join(";")))
            .current_dir(project_dir)
            .stdout_to_stderr(self.quiet)
    }

    fn step(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", "→".blue(), message);
        }
    }

    fn detail(&self, message: &str) {
        if !self.quiet {
            println!("  {} {}", "•".dimmed(), message.dimmed());
        }
    }

    fn warn(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", "!".yellow(), message.yellow());
        }
    }
}

/// First settings file in `project_dir`, if any.
pub fn discover_settings(project_dir: &Path) -> Result<Option<PathBuf>> {
    let found = find_all(project_dir, SETTINGS_PATTERN, false)?;
    Ok(found.into_iter().next().map(|c| c.path))
}

/// `<prefix><path>` as a single argument, for tools using `/key:value` syntax.
fn prefixed(prefix: &str, path: &Path) -> std::ffi::OsString {
    let mut arg = std::ffi::OsString::from(prefix);
    arg.push(path.as_os_str());
    arg
}
