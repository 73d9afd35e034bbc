//! Request and result types for backup/switch commands

use super::version::BackupType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a create-backup request (HTTP or realtime)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupRequest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(rename = "type", default)]
    pub backup_type: BackupType,
}

/// Body of a switch request
///
/// The realtime channel historically sends the bare version string, the HTTP
/// API sends `{"version": ...}`; both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SwitchRequest {
    Bare(String),
    Object { version: String },
}

impl SwitchRequest {
    pub fn version(&self) -> &str {
        match self {
            SwitchRequest::Bare(v) => v,
            SwitchRequest::Object { version } => version,
        }
    }
}

/// Outcome of a successful backup script run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupResult {
    pub success: bool,
    pub message: String,
    pub backup_name: String,
    pub output: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a successful switch script run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchResult {
    pub success: bool,
    pub message: String,
    pub version: String,
    pub output: String,
    pub timestamp: DateTime<Utc>,
}
