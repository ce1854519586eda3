// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Subprocess execution with deadlines
//!
//! Detectors and the installer shell out to `git`, the package manager and
//! arbitrary `<tool> --version` probes. All of them go through
//! [`CommandRunner`] so a hung binary is bounded by a timeout and tests can
//! script the outcome.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status was zero
    pub success: bool,
    /// Trimmed standard output
    pub stdout: String,
    /// Trimmed standard error
    pub stderr: String,
    /// Exit code, absent when killed by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Build from a finished process
    #[must_use]
    pub fn from_output(output: &std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code(),
        }
    }

    /// Successful output with the given stdout
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    /// Failed output with the given stderr
    #[must_use]
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(1),
        }
    }

    /// Best message describing a failure
    #[must_use]
    pub fn failure_message(&self) -> String {
        if !self.stderr.is_empty() {
            self.stderr.clone()
        } else if !self.stdout.is_empty() {
            self.stdout.clone()
        } else {
            match self.exit_code {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            }
        }
    }
}

/// Reasons a process produced no output at all
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Binary missing or not executable
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Deadline passed; the child was killed
    #[error("{program} timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// Program name
        program: String,
        /// Deadline that elapsed
        timeout: Duration,
    },
}

/// Runs external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program args...` in `cwd`, killing it after `timeout`
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Result<CommandOutput, ProcessError>;
}

/// Runs real processes through tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Result<CommandOutput, ProcessError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        tracing::trace!(program, ?args, "spawning");

        match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => Ok(CommandOutput::from_output(&output)),
            Ok(Err(source)) => Err(ProcessError::Spawn {
                program: program.to_string(),
                source,
            }),
            Err(_) => Err(ProcessError::Timeout {
                program: program.to_string(),
                timeout,
            }),
        }
    }
}
