//! The two operator-supplied install parameters.

use serde::{Deserialize, Serialize};

use crate::error::{InstallError, Result};

/// TCP port the application listens on. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    pub fn new(value: u16) -> Result<Self> {
        if value == 0 {
            return Err(InstallError::InvalidPort(value.to_string()));
        }
        Ok(Port(value))
    }

    /// Parse a trimmed decimal port number.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let value: u16 = trimmed
            .parse()
            .map_err(|_| InstallError::InvalidPort(trimmed.to_string()))?;
        Self::new(value)
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Port {
    type Error = InstallError;

    fn try_from(value: u16) -> Result<Self> {
        Port::new(value)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> u16 {
        port.0
    }
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters of one install run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRequest {
    /// Repository cloned into the install directory.
    pub repo_url: String,

    /// Value of `PORT` in the service environment.
    pub port: Port,

    /// Non-privileged user that owns the checkout and runs the service.
    pub owner: String,
}

impl InstallRequest {
    pub fn new(repo_url: impl Into<String>, port: Port, owner: impl Into<String>) -> Result<Self> {
        let repo_url = repo_url.into().trim().to_string();
        if repo_url.is_empty() {
            return Err(InstallError::InvalidRequest(
                "repository URL cannot be empty".to_string(),
            ));
        }
        let owner = owner.into();
        if owner.is_empty() {
            return Err(InstallError::InvalidRequest("owner cannot be empty".to_string()));
        }
        // The owner lands in `User=` of the unit file.
        if owner.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(InstallError::InvalidRequest(format!(
                "owner cannot contain whitespace or control characters: {owner:?}"
            )));
        }
        Ok(Self {
            repo_url,
            port,
            owner,
        })
    }

    /// URL printed at the end of a successful run.
    pub fn access_url(&self) -> String {
        format!("http://localhost:{}/", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_parse_trims() {
        assert_eq!(Port::parse(" 8080\n").unwrap().get(), 8080);
    }

    #[test]
    fn test_port_rejects_zero_and_garbage() {
        assert!(matches!(Port::parse("0"), Err(InstallError::InvalidPort(_))));
        assert!(matches!(Port::parse("eighty"), Err(InstallError::InvalidPort(_))));
        assert!(matches!(Port::parse("70000"), Err(InstallError::InvalidPort(_))));
        assert!(matches!(Port::parse("-1"), Err(InstallError::InvalidPort(_))));
    }

    #[test]
    fn test_port_serde_rejects_zero() {
        assert!(serde_json::from_str::<Port>("0").is_err());
        assert_eq!(serde_json::from_str::<Port>("8000").unwrap().get(), 8000);
    }

    #[test]
    fn test_request_rejects_blank_url() {
        let err = InstallRequest::new("   ", Port::new(8000).unwrap(), "shop").unwrap_err();
        assert!(matches!(err, InstallError::InvalidRequest(_)));
    }

    #[test]
    fn test_request_rejects_owner_with_newline() {
        let err = InstallRequest::new(
            "https://example.com/shop.git",
            Port::new(8000).unwrap(),
            "shop\nExecStartPre=/bin/sh",
        )
        .unwrap_err();
        assert!(matches!(err, InstallError::InvalidRequest(_)));
    }

    #[test]
    fn test_access_url() {
        let request =
            InstallRequest::new("https://example.com/shop.git", Port::new(8123).unwrap(), "shop")
                .unwrap();
        assert_eq!(request.access_url(), "http://localhost:8123/");
    }
}
