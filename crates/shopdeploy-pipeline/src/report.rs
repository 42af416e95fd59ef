//! Outcome of an install run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shopdeploy_core::{InstallError, Phase, Result};

/// How a step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    /// Not run because an earlier step failed.
    Skipped,
}

/// Per-step record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub phase: Phase,
    pub step: String,
    pub status: StepStatus,
    /// `None` for filesystem steps and skipped steps.
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

impl StepOutcome {
    pub fn skipped(phase: Phase, step: String) -> Self {
        Self {
            phase,
            step,
            status: StepStatus::Skipped,
            exit_code: None,
            duration_ms: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == StepStatus::Succeeded
    }
}

/// Details of the step that stopped the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub phase: Phase,
    pub step: String,
    pub exit_code: i32,
    pub detail: String,
}

/// Result of a complete install run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
    pub steps: Vec<StepOutcome>,
    /// SHA-256 of the unit file content this run would write.
    pub unit_digest: String,
    pub url: String,
    /// HEAD of the checkout after the run, when it could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
}

impl InstallReport {
    pub fn passed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.passed()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Skipped)
            .count()
    }

    /// Convert a failed run into the error of its failing step.
    pub fn into_result(self) -> Result<InstallReport> {
        if let Some(failure) = &self.failure {
            return Err(InstallError::StepFailed {
                phase: failure.phase,
                step: failure.step.clone(),
                exit_code: failure.exit_code,
                detail: failure.detail.clone(),
            });
        }
        Ok(self)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
