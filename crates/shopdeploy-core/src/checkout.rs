//! Inspection of the application checkout on the host.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// What is currently at the install directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    /// A git checkout exists; it gets a fast-forward update.
    Existing,
    /// The directory exists but is not a checkout; it is removed and recloned.
    Stale,
    /// Nothing there yet; fresh clone.
    Absent,
}

impl CheckoutState {
    pub fn probe(dir: &Path) -> Self {
        if dir.join(".git").exists() {
            CheckoutState::Existing
        } else if dir.exists() {
            CheckoutState::Stale
        } else {
            CheckoutState::Absent
        }
    }
}
