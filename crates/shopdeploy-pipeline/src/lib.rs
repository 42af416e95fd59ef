//! Shop Deploy Pipeline
//!
//! Turns an install request into an ordered plan of steps and runs it:
//! - OS packages, checkout, ownership, virtualenv, dependencies
//! - writes the systemd unit, then reload/enable/restart
//! - stops at the first failing step (no retries, no rollback)

pub mod fakes;
pub mod pipeline;
pub mod plan;
pub mod report;
pub mod runner;
pub mod step;

// Re-export key types
pub use pipeline::InstallPipeline;
pub use plan::InstallPlan;
pub use report::{InstallReport, StepOutcome, StepStatus};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
pub use step::{CommandSpec, Step, StepAction};
