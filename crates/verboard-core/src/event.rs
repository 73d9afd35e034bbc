//! Realtime event vocabulary
//!
//! Both directions use the same envelope on the wire:
//! `{"event": "<kebab-case name>", "data": <payload>}`.

use crate::models::{
    BackupRequest, BackupResult, SwitchRequest, SwitchResult, SystemStatus, VersionEntry,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named channel a session can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Monitoring,
    Backups,
    Notifications,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Monitoring, Topic::Backups, Topic::Notifications];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Monitoring => "monitoring",
            Topic::Backups => "backups",
            Topic::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monitoring" => Ok(Topic::Monitoring),
            "backups" => Ok(Topic::Backups),
            "notifications" => Ok(Topic::Notifications),
            other => Err(format!("unknown topic '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Payload of every `*-error` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}

impl ErrorPayload {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub message: String,
}

/// Events sent from the server to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    StatusUpdate(SystemStatus),
    VersionsUpdated(Vec<VersionEntry>),
    BackupStarted(MessagePayload),
    BackupCompleted(BackupResult),
    BackupError(ErrorPayload),
    SwitchCompleted(SwitchResult),
    SwitchError(ErrorPayload),
    Notification(Notification),
    Authenticated,
    AuthError(ErrorPayload),
    Subscribed(Topic),
    SubscribeError(ErrorPayload),
    ProtocolError(ErrorPayload),
}

impl ServerEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::StatusUpdate(_) => "status-update",
            ServerEvent::VersionsUpdated(_) => "versions-updated",
            ServerEvent::BackupStarted(_) => "backup-started",
            ServerEvent::BackupCompleted(_) => "backup-completed",
            ServerEvent::BackupError(_) => "backup-error",
            ServerEvent::SwitchCompleted(_) => "switch-completed",
            ServerEvent::SwitchError(_) => "switch-error",
            ServerEvent::Notification(_) => "notification",
            ServerEvent::Authenticated => "authenticated",
            ServerEvent::AuthError(_) => "auth-error",
            ServerEvent::Subscribed(_) => "subscribed",
            ServerEvent::SubscribeError(_) => "subscribe-error",
            ServerEvent::ProtocolError(_) => "protocol-error",
        }
    }

    /// Just the `data` part, for transports that carry the name separately (SSE)
    pub fn data_json(&self) -> String {
        let value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        match value.get("data") {
            Some(data) => data.to_string(),
            None => "{}".to_string(),
        }
    }
}

/// Commands sent from clients to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    GetStatus,
    CreateBackup(BackupRequest),
    SwitchVersion(SwitchRequest),
    Authenticate(String),
    Subscribe(Topic),
    Unsubscribe(Topic),
}
