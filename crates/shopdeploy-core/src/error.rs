//! Error taxonomy for the installer.

use serde::{Deserialize, Serialize};

/// Stage of the install a step belongs to.
///
/// Failures are reported against the phase so the operator can tell a
/// package-manager problem from a git or systemd one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// OS package installation.
    Packages,
    /// Fresh clone or fast-forward update of the application source.
    Checkout,
    /// Handing the checkout to the invoking user.
    Ownership,
    /// Creating the virtual environment.
    Environment,
    /// Installing declared dependencies into the virtual environment.
    Dependencies,
    /// Writing the service unit file.
    ServiceUnit,
    /// `systemctl` reload/enable/restart.
    ServiceManager,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Packages => "packages",
            Phase::Checkout => "checkout",
            Phase::Ownership => "ownership",
            Phase::Environment => "environment",
            Phase::Dependencies => "dependencies",
            Phase::ServiceUnit => "service_unit",
            Phase::ServiceManager => "service_manager",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Installer errors.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("privilege error: {0}")]
    Privilege(String),

    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    #[error("invalid install request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {secs} seconds")]
    Timeout { program: String, secs: u64 },

    #[error("{phase} failed at step '{step}' (exit code {exit_code}): {detail}")]
    StepFailed {
        phase: Phase,
        step: String,
        exit_code: i32,
        detail: String,
    },

    #[error("git error: {0}")]
    Git(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallError {
    /// Phase of a failed step, if this error came from one.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            InstallError::StepFailed { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Result type for installer operations.
pub type Result<T> = std::result::Result<T, InstallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failed_display_names_phase_and_step() {
        let err = InstallError::StepFailed {
            phase: Phase::Checkout,
            step: "git pull --ff-only".to_string(),
            exit_code: 128,
            detail: "fatal: Not possible to fast-forward, aborting.".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("checkout failed"));
        assert!(msg.contains("git pull --ff-only"));
        assert!(msg.contains("128"));
        assert_eq!(err.phase(), Some(Phase::Checkout));
    }

    #[test]
    fn test_invalid_port_display() {
        let err = InstallError::InvalidPort("http".to_string());
        assert_eq!(err.to_string(), "invalid port: \"http\"");
        assert!(err.phase().is_none());
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        let json = serde_json::to_string(&Phase::ServiceManager).unwrap();
        assert_eq!(json, "\"service_manager\"");
    }
}
