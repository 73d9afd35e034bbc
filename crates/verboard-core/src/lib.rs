//! verboard-core - Core library for verboard
//!
//! Backup registry, state parsing, status aggregation, script execution,
//! realtime hub and file watcher for a versioned application's backups.

pub mod changelog;
pub mod config;
pub mod error;
pub mod event;
pub mod executor;
pub mod hub;
pub mod manager;
pub mod models;
pub mod parsers;
pub mod probes;
pub mod registry;
pub mod restore_points;
pub mod status;
pub mod watcher;

pub use config::{FileConfig, ManagerConfig};
pub use error::{CoreError, ErrorCategory, LoadError};
pub use event::{ClientMessage, NotificationLevel, ServerEvent, Topic};
pub use hub::{BroadcastHub, SessionId, SessionState};
pub use manager::VersionManager;
pub use watcher::{FileWatcher, WatcherConfig};
