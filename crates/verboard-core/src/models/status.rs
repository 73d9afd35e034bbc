//! Status snapshot and the externally owned state document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder for any status field that could not be determined
pub const NOT_AVAILABLE: &str = "N/A";

/// State document written by the backup scripts (`state.json`)
///
/// The schema belongs to the scripts; unknown fields are ignored and every
/// field is optional. Only the fields the status reads are typed, so a
/// malformed advisory field cannot hide a valid `current_version`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub current_version: Option<String>,

    #[serde(default)]
    pub last_backup: Option<String>,

    /// Advisory counter kept by the scripts; the live directory scan wins
    #[serde(default)]
    pub total_backups: Option<serde_json::Value>,

    #[serde(default)]
    pub backups: Option<serde_json::Value>,
}

/// Aggregated system status, recomputed on every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub current_version: String,
    pub last_backup: String,
    pub total_backups: usize,
    pub disk_usage: String,
    pub memory_usage: String,
    pub platform: String,
    pub timestamp: DateTime<Utc>,

    /// Present when part of the status had to be defaulted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SystemStatus {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}
