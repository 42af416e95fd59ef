//! Structured lifecycle events for an install run.
//!
//! Events are emitted at `info!` (failures at `error!`) with an `event`
//! field so JSON logs can be filtered by kind.

use tracing::{error, info};

use crate::error::Phase;

/// Span tagged with the run id; attach it to the install future with
/// `tracing::Instrument` so every step event carries `run_id`.
pub fn install_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("shopdeploy.install", run_id = %run_id)
}

pub fn emit_install_started(run_id: &str, repo_url: &str, port: u16, total_steps: usize) {
    info!(
        event = "install.started",
        run_id = %run_id,
        repo_url = %repo_url,
        port = port,
        total_steps = total_steps,
    );
}

pub fn emit_step_started(phase: Phase, step: &str, index: usize) {
    info!(event = "step.started", phase = %phase, step = %step, index = index);
}

pub fn emit_step_finished(phase: Phase, step: &str, duration_ms: u64) {
    info!(
        event = "step.finished",
        phase = %phase,
        step = %step,
        duration_ms = duration_ms,
    );
}

pub fn emit_step_failed(phase: Phase, step: &str, exit_code: i32, detail: &str) {
    error!(
        event = "step.failed",
        phase = %phase,
        step = %step,
        exit_code = exit_code,
        detail = %detail,
    );
}

pub fn emit_install_finished(run_id: &str, duration_ms: u64, success: bool) {
    info!(
        event = "install.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        success = success,
    );
}
