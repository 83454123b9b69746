//! Command Execution
//!
//! The executor seam between pipeline stages and the outside world.
//! Stages and lifecycle hooks run shell commands through a
//! `CommandExecutor`, so tests can swap in scripted executors.

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use tokio::process::Command;

/// Captured result of one command execution
#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    /// Process exit code; -1 when killed by a signal, 127 when the
    /// command could not be spawned
    pub exit_code: i32,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,
}

impl ExecutionOutput {
    /// Whether the command exited successfully
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Failure detail suitable for status records
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit code {}", self.exit_code)
        } else {
            format!("exit code {}: {}", self.exit_code, stderr)
        }
    }
}

/// Executes shell commands on behalf of pipeline stages
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command to completion, capturing its output
    ///
    /// Spawn failures are reported through the output's exit code and
    /// stderr rather than an error: to the pipeline a command that could
    /// not start and a command that failed look the same.
    async fn execute(&self, command: &str) -> ExecutionOutput;
}

/// Command executor backed by the system shell
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor {
    working_dir: Option<PathBuf>,
}

impl ShellExecutor {
    /// Create an executor running commands in the current directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor running commands in the given directory
    pub fn with_working_dir<P: AsRef<Path>>(working_dir: P) -> Self {
        Self {
            working_dir: Some(working_dir.as_ref().to_path_buf()),
        }
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, command: &str) -> ExecutionOutput {
        let shell = if cfg!(windows) { "cmd" } else { "sh" };
        let shell_arg = if cfg!(windows) { "/C" } else { "-c" };

        log::debug!("Executing command: {}", command);

        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg).arg(command);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        match cmd.output().await {
            Ok(output) => ExecutionOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            },
            Err(e) => ExecutionOutput {
                exit_code: 127,
                stdout: String::new(),
                stderr: format!("failed to spawn '{}': {}", command, e),
            },
        }
    }
}
