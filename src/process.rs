//! External process invocation.
//!
//! Everything the installer shells out to (`npm`, `node`, `uvx`, `git`) goes
//! through [`CommandRunner`] so callers can be exercised without the tools.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

use crate::retry::Retryable;

/// A command to run on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Let the child write straight to our terminal instead of capturing.
    pub inherit_output: bool,
}

impl HostCommand {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            inherit_output: false,
        }
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn inherit_output(mut self) -> Self {
        self.inherit_output = true;
        self
    }

    /// `program arg1 arg2`, for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl Retryable for ProcessError {
    fn is_retryable(&self) -> bool {
        true
    }
}

pub trait CommandRunner {
    /// Run to completion. `Err` only when the process could not be started.
    fn run(&self, command: &HostCommand) -> io::Result<CommandOutput>;

    /// Run and require a zero exit status; returns captured stdout.
    fn run_checked(&self, command: &HostCommand) -> Result<String, ProcessError> {
        let output = self.run(command).map_err(|source| ProcessError::Spawn {
            command: command.display(),
            source,
        })?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(ProcessError::Failed {
                command: command.display(),
                status: output
                    .code
                    .map_or_else(|| "a signal".to_string(), |c| format!("status {c}")),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs commands with `std::process::Command`, blocking until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &HostCommand) -> io::Result<CommandOutput> {
        debug!("Running: {}", command.display());
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        if command.inherit_output {
            let status = cmd.stdin(Stdio::null()).status()?;
            return Ok(CommandOutput {
                success: status.success(),
                code: status.code(),
                ..CommandOutput::default()
            });
        }

        let output = cmd.stdin(Stdio::null()).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
