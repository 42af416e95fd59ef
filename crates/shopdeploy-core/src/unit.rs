//! systemd service unit for the deployed application.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

use crate::config::Settings;
use crate::request::{InstallRequest, Port};

const UNIT_TEMPLATE: &str = r#"[Unit]
Description={{DESCRIPTION}}
After=network.target

[Service]
Type=simple
User={{USER}}
WorkingDirectory={{WORK_DIR}}
Environment=PORT={{PORT}}
ExecStart={{EXEC_START}}
Restart=always
RestartSec=5

[Install]
WantedBy=multi-user.target
"#;

/// Contents of the generated `.service` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUnit {
    pub description: String,
    pub user: String,
    pub working_dir: PathBuf,
    pub port: Port,
    pub exec_start: String,
}

impl ServiceUnit {
    /// Unit for `request`, rooted at the configured install directory.
    pub fn new(settings: &Settings, request: &InstallRequest) -> Self {
        let exec_start = format!(
            "{} {}",
            settings.python_bin().display(),
            settings.entry_path().display()
        );
        Self {
            description: settings.description.clone(),
            user: request.owner.clone(),
            working_dir: settings.install_dir.clone(),
            port: request.port,
            exec_start,
        }
    }

    pub fn render(&self) -> String {
        UNIT_TEMPLATE
            .replace("{{DESCRIPTION}}", &self.description)
            .replace("{{USER}}", &self.user)
            .replace("{{WORK_DIR}}", &self.working_dir.display().to_string())
            .replace("{{PORT}}", &self.port.to_string())
            .replace("{{EXEC_START}}", &self.exec_start)
    }

    /// SHA-256 hex of the rendered unit.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.render().as_bytes());
        hex::encode(hasher.finalize())
    }
}
