//! External command execution.

use async_trait::async_trait;
use shopdeploy_core::{InstallError, Result};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

use crate::step::CommandSpec;

/// Captured result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; -1 when the process was killed by a signal.
    pub exit_code: i32,

    pub stdout: String,

    pub stderr: String,

    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Output with the given exit code and stdout, for scripted replies.
    pub fn with_exit(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            duration_ms: 0,
        }
    }
}

/// Seam between the pipeline and the operating system.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `cmd` to completion.
    ///
    /// A non-zero exit is not an error here; the caller inspects
    /// [`CommandOutput::exit_code`]. Errors are reserved for spawn
    /// failures and timeouts.
    async fn run(&self, cmd: &CommandSpec, timeout: Option<Duration>) -> Result<CommandOutput>;
}

/// Runs commands on the host with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, cmd: &CommandSpec, timeout: Option<Duration>) -> Result<CommandOutput> {
        let start = Instant::now();
        debug!(command = %cmd.command_line(), "Spawning");

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .envs(cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| InstallError::Spawn {
            program: cmd.program.clone(),
            source,
        })?;

        let output = match timeout {
            Some(limit) if !limit.is_zero() => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| InstallError::Timeout {
                    program: cmd.program.clone(),
                    secs: limit.as_secs(),
                })??,
            _ => child.wait_with_output().await?,
        };

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        debug!(
            command = %cmd.command_line(),
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            "Finished"
        );
        Ok(result)
    }
}
