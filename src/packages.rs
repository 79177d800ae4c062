//! Package references of the test project, managed through the dotnet CLI

use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::process::{capture_checked, run_checked, ProcessRunner, ToolCommand};

/// Lists and adds package references with `dotnet list/add package`
pub struct PackageManager<'a> {
    runner: &'a dyn ProcessRunner,
    dotnet: &'a str,
    stdout_to_stderr: bool,
}

impl<'a> PackageManager<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, dotnet: &'a str) -> Self {
        Self {
            runner,
            dotnet,
            stdout_to_stderr: false,
        }
    }

    /// Send `dotnet add package` output to stderr
    pub fn stdout_to_stderr(mut self, redirect: bool) -> Self {
        self.stdout_to_stderr = redirect;
        self
    }

    /// Lower-cased ids of the packages referenced by `project`.
    pub fn list_installed(&self, project: &Path) -> Result<BTreeSet<String>> {
        let cmd = ToolCommand::new("dotnet list package", self.dotnet)
            .arg("list")
            .arg(project)
            .arg("package");

        let stdout = capture_checked(self.runner, &cmd)?;
        Ok(parse_package_list(&stdout))
    }

    pub fn add_package(&self, project: &Path, package_id: &str) -> Result<()> {
        let cmd = ToolCommand::new("dotnet add package", self.dotnet)
            .arg("add")
            .arg(project)
            .arg("package")
            .arg(package_id)
            .stdout_to_stderr(self.stdout_to_stderr);

        run_checked(self.runner, &cmd)
    }

    /// Add each package in `required` that `project` does not reference yet.
    /// Returns the ids that were added.
    pub fn ensure(&self, project: &Path, required: &[&str]) -> Result<Vec<String>> {
        let installed = self.list_installed(project)?;
        let mut added = Vec::new();

        for package_id in required {
            if installed.contains(&package_id.to_lowercase()) {
                continue;
            }

            info!(package = %package_id, project = %project.display(), "adding missing package");
            self.add_package(project, package_id)?;
            added.push(package_id.to_string());
        }

        Ok(added)
    }
}

/// Parse the table printed by `dotnet list package`.
///
/// ```text
/// Project 'Tests' has the following package references
///    [net8.0]:
///    Top-level Package                Requested   Resolved
///    > Microsoft.NET.Test.Sdk         17.8.0      17.8.0
///    > xunit                          2.6.1       2.6.1
/// ```
pub fn parse_package_list(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix('>'))
        .filter_map(|rest| rest.split_whitespace().next())
        .map(|id| id.to_lowercase())
        .collect()
}
