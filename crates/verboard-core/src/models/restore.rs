//! Restore points and changelog payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of restore point; only revision-control tags exist today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestorePointKind {
    GitTag,
}

/// A named rollback target, distinct from a backup artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestorePoint {
    #[serde(rename = "type")]
    pub kind: RestorePointKind,
    pub name: String,
    pub description: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl RestorePoint {
    pub fn git_tag(name: impl Into<String>, timestamp: Option<DateTime<Utc>>) -> Self {
        let name = name.into();
        Self {
            kind: RestorePointKind::GitTag,
            description: format!("Git tag: {}", name),
            name,
            timestamp,
        }
    }
}

/// Change list between two versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changelog {
    pub version1: String,
    pub version2: String,
    pub changes: Vec<String>,
    pub timestamp: DateTime<Utc>,
    /// True when `changes` is a fixed list rather than a computed diff
    pub placeholder: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
