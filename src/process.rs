//! External process execution
//!
//! Every external tool is invoked from a [`ToolCommand`]: a program and a
//! list of discrete arguments, never a shell string.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::{CovxError, Result};

/// A program invocation with structured arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Short name used in messages ("dotnet test", "coverage converter")
    pub label: String,
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    /// Send the child's stdout to our stderr, keeping our stdout clean
    pub stdout_to_stderr: bool,
}

impl ToolCommand {
    pub fn new(label: impl Into<String>, program: impl AsRef<OsStr>) -> Self {
        Self {
            label: label.into(),
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
            stdout_to_stderr: false,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn stdout_to_stderr(mut self, redirect: bool) -> Self {
        self.stdout_to_stderr = redirect;
        self
    }

    /// Arguments as lossy strings, for assertions and display.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        if self.stdout_to_stderr {
            cmd.stdout(io::stderr());
        }
        cmd
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Exit status of a finished tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    /// `None` when the process was terminated by a signal
    pub code: Option<i32>,
}

impl ToolExit {
    pub fn success(self) -> bool {
        self.code == Some(0)
    }
}

/// Output of a tool whose stdout was captured
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub exit: ToolExit,
    pub stdout: String,
}

/// Runs external tools. Blocks until the process exits.
pub trait ProcessRunner {
    /// Run with inherited stdio, or stdout sent to stderr when the
    /// command asks for it.
    fn run(&self, command: &ToolCommand) -> Result<ToolExit>;

    /// Run with stdout captured.
    fn capture(&self, command: &ToolCommand) -> Result<CapturedOutput>;
}

/// Run `command` and fail with `ExternalToolFailure` on a non-zero exit.
pub fn run_checked(runner: &dyn ProcessRunner, command: &ToolCommand) -> Result<()> {
    let exit = runner.run(command)?;
    ensure_success(command, exit)
}

/// Capture `command` and fail with `ExternalToolFailure` on a non-zero exit.
pub fn capture_checked(runner: &dyn ProcessRunner, command: &ToolCommand) -> Result<String> {
    let output = runner.capture(command)?;
    ensure_success(command, output.exit)?;
    Ok(output.stdout)
}

fn ensure_success(command: &ToolCommand, exit: ToolExit) -> Result<()> {
    if exit.success() {
        Ok(())
    } else {
        Err(CovxError::ExternalToolFailure {
            tool: command.label.clone(),
            code: exit.code,
        })
    }
}

/// [`ProcessRunner`] backed by `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

impl SystemProcessRunner {
    fn spawn_error(command: &ToolCommand, e: io::Error) -> CovxError {
        if e.kind() == io::ErrorKind::NotFound {
            CovxError::not_found(format!("Executable for {}", command.label), &command.program)
        } else {
            CovxError::io(&command.program, e)
        }
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolExit> {
        debug!(%command, "running");

        let status = command
            .to_command()
            .stdin(Stdio::null())
            .status()
            .map_err(|e| Self::spawn_error(command, e))?;

        debug!(label = %command.label, code = ?status.code(), "finished");
        Ok(ToolExit { code: status.code() })
    }

    fn capture(&self, command: &ToolCommand) -> Result<CapturedOutput> {
        debug!(%command, "capturing");

        let output = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| Self::spawn_error(command, e))?;

        Ok(CapturedOutput {
            exit: ToolExit {
                code: output.status.code(),
            },
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}
