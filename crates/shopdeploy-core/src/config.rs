//! Install settings.
//!
//! The installer has a fixed layout on the host: checkout directory,
//! unit directory, service name and the package list. Those constants
//! live here and can be overridden from a TOML file; anything not present
//! in the file keeps its default.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::error::{InstallError, Result};

pub const DEFAULT_INSTALL_DIR: &str = "/opt/shop-management-system";
pub const DEFAULT_SERVICE_NAME: &str = "shop-management";
pub const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";
pub const DEFAULT_REPO_URL: &str = "https://github.com/shop-management/shop-management-system.git";
pub const DEFAULT_PORT: u16 = 8000;

/// Host layout and tool choices for an install run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Where the application checkout lives.
    pub install_dir: PathBuf,

    /// systemd unit name, without the `.service` suffix.
    pub service_name: String,

    /// Directory the unit file is written to.
    pub unit_dir: PathBuf,

    /// `Description=` of the unit.
    pub description: String,

    /// Repository offered at the URL prompt.
    pub default_repo_url: String,

    /// Port offered at the port prompt.
    pub default_port: u16,

    /// OS package manager executable.
    pub package_manager: String,

    /// OS packages installed before checkout.
    pub packages: Vec<String>,

    /// Interpreter used to create the virtual environment.
    pub python: String,

    /// Name of the virtual environment directory under `install_dir`.
    pub venv_dir_name: String,

    /// Application entry point, relative to `install_dir`.
    pub app_entry: String,

    /// Dependency manifest, relative to `install_dir`.
    pub requirements_file: String,

    /// Per-command timeout in seconds; 0 disables it.
    pub step_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            unit_dir: PathBuf::from(DEFAULT_UNIT_DIR),
            description: "Shop Management System".to_string(),
            default_repo_url: DEFAULT_REPO_URL.to_string(),
            default_port: DEFAULT_PORT,
            package_manager: "apt-get".to_string(),
            packages: vec![
                "git".to_string(),
                "python3".to_string(),
                "python3-venv".to_string(),
                "python3-pip".to_string(),
            ],
            python: "python3".to_string(),
            venv_dir_name: "venv".to_string(),
            app_entry: "app.py".to_string(),
            requirements_file: "requirements.txt".to_string(),
            step_timeout_secs: 900,
        }
    }
}

impl Settings {
    /// Parse settings from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(text).map_err(|e| InstallError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("No settings file given, using defaults");
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)
            .map_err(|e| InstallError::Config(format!("cannot read {}: {e}", path.display())))?;
        let settings = Self::from_toml_str(&text)
            .map_err(|e| InstallError::Config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        validate_install_dir(&self.install_dir)?;
        if self.service_name.is_empty()
            || self.service_name.contains('/')
            || self.service_name.chars().any(char::is_whitespace)
        {
            return Err(InstallError::Config(format!(
                "invalid service_name {:?}",
                self.service_name
            )));
        }
        if self.default_port == 0 {
            return Err(InstallError::Config("default_port must be non-zero".to_string()));
        }
        if self.packages.is_empty() {
            return Err(InstallError::Config("packages cannot be empty".to_string()));
        }
        if self.description.chars().any(char::is_control) {
            return Err(InstallError::Config(format!(
                "description cannot contain control characters: {:?}",
                self.description
            )));
        }
        Ok(())
    }

    pub fn venv_dir(&self) -> PathBuf {
        self.install_dir.join(&self.venv_dir_name)
    }

    pub fn python_bin(&self) -> PathBuf {
        self.venv_dir().join("bin").join("python")
    }

    pub fn pip_bin(&self) -> PathBuf {
        self.venv_dir().join("bin").join("pip")
    }

    pub fn entry_path(&self) -> PathBuf {
        self.install_dir.join(&self.app_entry)
    }

    pub fn requirements_path(&self) -> PathBuf {
        self.install_dir.join(&self.requirements_file)
    }

    /// `<service_name>.service`
    pub fn unit_name(&self) -> String {
        format!("{}.service", self.service_name)
    }

    pub fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(self.unit_name())
    }
}

/// The install dir is removed and recloned when it is not a checkout, so
/// it must be a dedicated directory at least two levels below `/`.
fn validate_install_dir(dir: &Path) -> Result<()> {
    let invalid = |reason: &str| {
        Err(InstallError::Config(format!(
            "install_dir {reason}, got {}",
            dir.display()
        )))
    };

    if !dir.is_absolute() {
        return invalid("must be absolute");
    }
    if dir.to_string_lossy().chars().any(char::is_control) {
        return invalid("cannot contain control characters");
    }
    if dir
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
    {
        return invalid("cannot contain `.` or `..` components");
    }
    let normal = dir
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count();
    if dir.file_name().is_none() || normal < 2 {
        return invalid("must be a dedicated directory below a top-level directory");
    }
    Ok(())
}
