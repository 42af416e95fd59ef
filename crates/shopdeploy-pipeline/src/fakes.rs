//! In-memory fakes for the command runner (testing only)
//!
//! `RecordingRunner` satisfies the [`CommandRunner`] contract without
//! touching the host: it records every command and answers with scripted
//! outputs.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use shopdeploy_core::Result;

use crate::runner::{CommandOutput, CommandRunner};
use crate::step::CommandSpec;

/// Records invocations and replies by command-line prefix.
///
/// Replies are matched in the order they were scripted; the first prefix
/// that the command line starts with wins. Unmatched commands succeed
/// with empty output.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    replies: Mutex<Vec<(String, CommandOutput)>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to commands starting with `prefix` with `output`.
    pub fn reply(self, prefix: impl Into<String>, output: CommandOutput) -> Self {
        self.replies.lock().unwrap().push((prefix.into(), output));
        self
    }

    /// Make commands starting with `prefix` exit with `code` and `stderr`.
    pub fn fail(self, prefix: impl Into<String>, code: i32, stderr: impl Into<String>) -> Self {
        self.reply(prefix, CommandOutput::with_exit(code, "", stderr))
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Command lines run so far, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::command_line).collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, cmd: &CommandSpec, _timeout: Option<Duration>) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(cmd.clone());

        let line = cmd.command_line();
        let replies = self.replies.lock().unwrap();
        let output = replies
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_defaults_to_success() {
        let runner = RecordingRunner::new();
        let output = runner
            .run(&CommandSpec::new("systemctl", ["daemon-reload"]), None)
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(runner.command_lines(), vec!["systemctl daemon-reload"]);
    }

    #[tokio::test]
    async fn test_scripted_failure_matches_prefix() {
        let runner = RecordingRunner::new().fail("git clone", 128, "repository not found");

        let output = runner
            .run(&CommandSpec::new("git", ["clone", "https://x", "/opt/shop"]), None)
            .await
            .unwrap();
        assert_eq!(output.exit_code, 128);
        assert_eq!(output.stderr, "repository not found");

        let other = runner
            .run(&CommandSpec::new("git", ["status"]), None)
            .await
            .unwrap();
        assert!(other.success());
    }

    #[tokio::test]
    async fn test_scripted_stdout() {
        let runner =
            RecordingRunner::new().reply("id -u", CommandOutput::with_exit(0, "1000\n", ""));
        let output = runner
            .run(&CommandSpec::new("id", ["-u"]), None)
            .await
            .unwrap();
        assert_eq!(output.stdout, "1000\n");
    }
}
