//! Data models for verboard

pub mod command;
pub mod restore;
pub mod status;
pub mod version;

pub use command::{BackupRequest, BackupResult, SwitchRequest, SwitchResult};
pub use restore::{Changelog, RestorePoint, RestorePointKind};
pub use status::{PersistedState, SystemStatus, NOT_AVAILABLE};
pub use version::{
    display_name, format_bytes, ArchiveFormat, BackupType, ReleaseChannel, VersionEntry,
};
