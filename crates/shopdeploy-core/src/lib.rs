//! Shop Deploy Core
//!
//! Domain pieces of the Shop Management System installer: install
//! settings, the interactive request, privilege handling, checkout probing
//! and the systemd service unit. Execution lives in `shopdeploy-pipeline`.

pub mod checkout;
pub mod config;
pub mod error;
pub mod obs;
pub mod privilege;
pub mod prompt;
pub mod request;
pub mod telemetry;
pub mod unit;

pub use checkout::CheckoutState;
pub use config::Settings;
pub use error::{InstallError, Phase, Result};
pub use privilege::{escalation_command, is_privileged, reexec_with_sudo, resolve_owner};
pub use prompt::{ask, ask_port, collect_request, RequestInputs};
pub use request::{InstallRequest, Port};
pub use telemetry::init_tracing;
pub use unit::ServiceUnit;
