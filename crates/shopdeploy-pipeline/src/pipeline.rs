//! Fail-fast execution of an install plan.

use chrono::Utc;
use shopdeploy_core::obs::{
    emit_install_finished, emit_install_started, emit_step_failed, emit_step_finished,
    emit_step_started, install_span,
};
use shopdeploy_core::{InstallError, Result};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::plan::{head_command, InstallPlan};
use crate::report::{InstallReport, StepFailure, StepOutcome, StepStatus};
use crate::runner::CommandRunner;
use crate::step::{Step, StepAction};

/// Keep failure details readable when a tool dumps a lot of output.
const DETAIL_TAIL_LINES: usize = 20;

/// Install pipeline orchestrator.
pub struct InstallPipeline;

impl InstallPipeline {
    /// Execute `plan` step by step.
    ///
    /// The first failing step stops the run: later steps are reported as
    /// skipped and never executed. A failed run is still `Ok`; use
    /// [`InstallReport::into_result`] to turn it into an error.
    pub async fn run(
        runner: &dyn CommandRunner,
        plan: &InstallPlan,
        timeout: Option<Duration>,
    ) -> Result<InstallReport> {
        let run_id = Uuid::new_v4().to_string();
        let span = install_span(&run_id);
        Self::run_steps(runner, plan, timeout, run_id)
            .instrument(span)
            .await
    }

    async fn run_steps(
        runner: &dyn CommandRunner,
        plan: &InstallPlan,
        timeout: Option<Duration>,
        run_id: String,
    ) -> Result<InstallReport> {
        let start = Instant::now();
        let started_at = Utc::now();

        emit_install_started(
            &run_id,
            &plan.request.repo_url,
            plan.request.port.get(),
            plan.steps.len(),
        );

        let mut outcomes = Vec::with_capacity(plan.steps.len());
        let mut failure: Option<StepFailure> = None;

        for (index, step) in plan.steps.iter().enumerate() {
            let name = step.name();
            if failure.is_some() {
                outcomes.push(StepOutcome::skipped(step.phase, name));
                continue;
            }

            emit_step_started(step.phase, &name, index + 1);
            let outcome = execute_step(runner, step, &name, timeout).await;

            if outcome.passed() {
                emit_step_finished(step.phase, &name, outcome.duration_ms);
            } else {
                let exit_code = outcome.exit_code.unwrap_or(-1);
                let detail = failure_detail(&outcome);
                emit_step_failed(step.phase, &name, exit_code, &detail);
                failure = Some(StepFailure {
                    phase: step.phase,
                    step: name,
                    exit_code,
                    detail,
                });
            }
            outcomes.push(outcome);
        }

        let success = failure.is_none();
        let head_sha = if success {
            read_head(runner, &plan.unit.working_dir, timeout).await
        } else {
            None
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        emit_install_finished(&run_id, duration_ms, success);

        if success {
            info!(url = %plan.url(), "Install completed");
        }

        Ok(InstallReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
            success,
            steps: outcomes,
            unit_digest: plan.unit.digest(),
            url: plan.url(),
            head_sha,
            failure,
        })
    }
}

async fn execute_step(
    runner: &dyn CommandRunner,
    step: &Step,
    name: &str,
    timeout: Option<Duration>,
) -> StepOutcome {
    let start = Instant::now();
    let result = match &step.action {
        StepAction::Command(spec) => runner.run(spec, timeout).await.map(Some),
        StepAction::RemoveDir { path } => remove_dir(path).await.map(|_| None),
        StepAction::WriteFile { path, contents } => {
            write_file(path, contents).await.map(|_| None)
        }
    };
    let elapsed = start.elapsed().as_millis() as u64;

    match result {
        Ok(Some(output)) => StepOutcome {
            phase: step.phase,
            step: name.to_string(),
            status: if output.success() {
                StepStatus::Succeeded
            } else {
                StepStatus::Failed
            },
            exit_code: Some(output.exit_code),
            duration_ms: output.duration_ms.max(elapsed),
            stdout: output.stdout,
            stderr: output.stderr,
        },
        Ok(None) => StepOutcome {
            phase: step.phase,
            step: name.to_string(),
            status: StepStatus::Succeeded,
            exit_code: None,
            duration_ms: elapsed,
            stdout: String::new(),
            stderr: String::new(),
        },
        // Spawn failures, timeouts and filesystem errors fail the step the
        // same way a non-zero exit does.
        Err(e) => StepOutcome {
            phase: step.phase,
            step: name.to_string(),
            status: StepStatus::Failed,
            exit_code: Some(-1),
            duration_ms: elapsed,
            stdout: String::new(),
            stderr: e.to_string(),
        },
    }
}

async fn remove_dir(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(())
}

fn failure_detail(outcome: &StepOutcome) -> String {
    let source = if outcome.stderr.trim().is_empty() {
        &outcome.stdout
    } else {
        &outcome.stderr
    };
    let lines: Vec<&str> = source.trim_end().lines().collect();
    let tail = &lines[lines.len().saturating_sub(DETAIL_TAIL_LINES)..];
    if tail.is_empty() {
        format!("exited with code {}", outcome.exit_code.unwrap_or(-1))
    } else {
        tail.join("\n")
    }
}

async fn read_head(
    runner: &dyn CommandRunner,
    dir: &Path,
    timeout: Option<Duration>,
) -> Option<String> {
    match capture_head(runner, dir, timeout).await {
        Ok(sha) => Some(sha),
        Err(e) => {
            warn!(error = %e, "Could not read checkout HEAD");
            None
        }
    }
}

async fn capture_head(
    runner: &dyn CommandRunner,
    dir: &Path,
    timeout: Option<Duration>,
) -> Result<String> {
    let output = runner.run(&head_command(dir), timeout).await?;
    if !output.success() {
        return Err(InstallError::Git(format!(
            "git rev-parse HEAD failed: {}",
            output.stderr.trim()
        )));
    }

    let sha = output.stdout.trim();
    if sha.is_empty() {
        return Err(InstallError::Git(
            "git rev-parse HEAD returned empty output".to_string(),
        ));
    }
    Ok(sha.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::RecordingRunner;
    use crate::runner::CommandOutput;
    use shopdeploy_core::Phase;

    fn outcome(stdout: &str, stderr: &str) -> StepOutcome {
        StepOutcome {
            phase: Phase::Checkout,
            step: "git pull".to_string(),
            status: StepStatus::Failed,
            exit_code: Some(1),
            duration_ms: 0,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_failure_detail_prefers_stderr() {
        let detail = failure_detail(&outcome(
            "Updating abc..def",
            "fatal: Not possible to fast-forward",
        ));
        assert_eq!(detail, "fatal: Not possible to fast-forward");
    }

    #[test]
    fn test_failure_detail_falls_back_to_stdout_then_code() {
        assert_eq!(
            failure_detail(&outcome("E: Unable to locate package", "")),
            "E: Unable to locate package"
        );
        assert_eq!(failure_detail(&outcome("", "  ")), "exited with code 1");
    }

    #[test]
    fn test_failure_detail_keeps_tail() {
        let noisy: String = (0..100).map(|i| format!("line {i}\n")).collect();
        let detail = failure_detail(&outcome("", &noisy));
        assert_eq!(detail.lines().count(), DETAIL_TAIL_LINES);
        assert!(detail.ends_with("line 99"));
    }

    #[tokio::test]
    async fn test_read_head_goes_through_runner() {
        let runner = RecordingRunner::new().reply(
            "git -c safe.directory=/srv/shop -C /srv/shop rev-parse HEAD",
            CommandOutput::with_exit(0, "0123abcd\n", ""),
        );

        let sha = read_head(&runner, Path::new("/srv/shop"), None).await;
        assert_eq!(sha.as_deref(), Some("0123abcd"));
        assert_eq!(runner.command_lines().len(), 1);
    }

    #[tokio::test]
    async fn test_read_head_failure_is_not_fatal() {
        let runner = RecordingRunner::new().fail("git", 128, "fatal: not a git repository");
        assert!(read_head(&runner, Path::new("/srv/shop"), None).await.is_none());

        let empty = RecordingRunner::new();
        assert!(matches!(
            capture_head(&empty, Path::new("/srv/shop"), None).await,
            Err(InstallError::Git(_))
        ));
    }

    #[tokio::test]
    async fn test_write_file_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system").join("shop.service");

        write_file(&path, "first").await.unwrap();
        write_file(&path, "second").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_remove_dir_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        remove_dir(&dir.path().join("never-existed")).await.unwrap();
    }
}
