//! Backup artifact models derived from the backups directory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const INSTALLER_PREFIX: &str = "installer_";

/// Release channel inferred from an artifact file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChannel {
    Stable,
    Beta,
}

impl ReleaseChannel {
    /// `stable` if the name contains "stable", `beta` otherwise
    pub fn from_file_name(name: &str) -> Self {
        if name.contains("stable") {
            ReleaseChannel::Stable
        } else {
            ReleaseChannel::Beta
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseChannel::Stable => "stable",
            ReleaseChannel::Beta => "beta",
        }
    }
}

/// Archive format inferred from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveFormat {
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "tar.gz")]
    TarGz,
}

impl ArchiveFormat {
    /// `zip` for `.zip` files, `tar.gz` for everything else
    pub fn from_file_name(name: &str) -> Self {
        if name.ends_with(".zip") {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::TarGz
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }
}

/// Backup type requested by the operator
///
/// Closed set; anything else is rejected at the API boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    #[default]
    Stable,
    Beta,
    Manual,
}

impl BackupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupType::Stable => "stable",
            BackupType::Beta => "beta",
            BackupType::Manual => "manual",
        }
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(BackupType::Stable),
            "beta" => Ok(BackupType::Beta),
            "manual" => Ok(BackupType::Manual),
            other => Err(format!(
                "unknown backup type '{}' (expected stable, beta or manual)",
                other
            )),
        }
    }
}

/// One artifact in the backups directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    /// Raw file name
    pub name: String,
    /// File name without the installer prefix and archive suffix
    pub display_name: String,
    pub path: PathBuf,
    /// Human readable size ("2 KB")
    pub size: String,
    pub size_bytes: u64,
    pub created: DateTime<Utc>,
    #[serde(rename = "type")]
    pub channel: ReleaseChannel,
    pub format: ArchiveFormat,
}

impl VersionEntry {
    /// Derive an entry from a file name and its stat data
    pub fn from_file(name: String, path: PathBuf, size_bytes: u64, created: DateTime<Utc>) -> Self {
        Self {
            display_name: display_name(&name),
            size: format_bytes(size_bytes),
            channel: ReleaseChannel::from_file_name(&name),
            format: ArchiveFormat::from_file_name(&name),
            name,
            path,
            size_bytes,
            created,
        }
    }
}

/// Strip the installer prefix, then `.tar.gz`, then `.zip`
pub fn display_name(file_name: &str) -> String {
    let name = file_name
        .strip_prefix(INSTALLER_PREFIX)
        .unwrap_or(file_name);
    let name = name.strip_suffix(".tar.gz").unwrap_or(name);
    let name = name.strip_suffix(".zip").unwrap_or(name);
    name.to_string()
}

/// Format a byte count with binary units and at most two decimals
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
