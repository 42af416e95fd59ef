//! Install step definitions.

use serde::{Deserialize, Serialize};
use shopdeploy_core::Phase;
use std::path::{Path, PathBuf};

/// An external command to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,

    /// Arguments, not including the program.
    pub args: Vec<String>,

    /// Extra environment variables.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<(String, String)>,

    /// Working directory, if not inherited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            cwd: None,
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Program and arguments joined by spaces, for logs and matching.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What a step does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
    /// Run an external command; non-zero exit fails the step.
    Command(CommandSpec),

    /// Recursively delete a directory.
    RemoveDir { path: PathBuf },

    /// Create or overwrite a file, creating parent directories.
    WriteFile { path: PathBuf, contents: String },
}

/// One step of an install plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub phase: Phase,
    pub action: StepAction,
}

impl Step {
    pub fn command(phase: Phase, spec: CommandSpec) -> Self {
        Self {
            phase,
            action: StepAction::Command(spec),
        }
    }

    pub fn remove_dir(phase: Phase, path: &Path) -> Self {
        Self {
            phase,
            action: StepAction::RemoveDir {
                path: path.to_path_buf(),
            },
        }
    }

    pub fn write_file(phase: Phase, path: &Path, contents: String) -> Self {
        Self {
            phase,
            action: StepAction::WriteFile {
                path: path.to_path_buf(),
                contents,
            },
        }
    }

    /// Human-readable step label.
    pub fn name(&self) -> String {
        match &self.action {
            StepAction::Command(spec) => spec.command_line(),
            StepAction::RemoveDir { path } => format!("remove {}", path.display()),
            StepAction::WriteFile { path, .. } => format!("write {}", path.display()),
        }
    }

    pub fn as_command(&self) -> Option<&CommandSpec> {
        match &self.action {
            StepAction::Command(spec) => Some(spec),
            _ => None,
        }
    }
}
