//! System status aggregation
//!
//! Combines the state file, the live registry count and host probes into one
//! snapshot. Each source fails independently; the snapshot is always produced.

use crate::error::ErrorSeverity;
use crate::models::{SystemStatus, NOT_AVAILABLE};
use crate::parsers::StateParser;
use crate::probes::HostProbe;
use crate::registry::BackupRegistry;
use chrono::Utc;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Builds [`SystemStatus`] snapshots on demand
pub struct StatusAggregator {
    state_file: PathBuf,
    parser: StateParser,
    registry: BackupRegistry,
    probe: HostProbe,
}

impl StatusAggregator {
    pub fn new(state_file: PathBuf, registry: BackupRegistry, probe: HostProbe) -> Self {
        Self {
            state_file,
            parser: StateParser::new(),
            registry,
            probe,
        }
    }

    /// Compute a fresh status; never fails
    pub async fn get_status(&self) -> SystemStatus {
        let (state_result, count_result, disk, memory) = tokio::join!(
            self.parser.parse_graceful(&self.state_file),
            self.registry.count(),
            self.probe.disk_usage(),
            self.probe.memory_usage(),
        );

        let (state, state_error) = state_result;
        let mut problems = Vec::new();
        if let Some(e) = state_error {
            if e.severity == ErrorSeverity::Error {
                warn!(error = %e, suggestion = ?e.suggestion, "State file unusable");
            }
            problems.push(match &e.suggestion {
                Some(hint) => format!("{} ({})", e, hint),
                None => e.to_string(),
            });
        }

        let total_backups = match count_result {
            Ok(n) => n,
            Err(e) => {
                problems.push(format!("registry: {}", e));
                0
            }
        };

        let status = SystemStatus {
            current_version: non_blank(state.current_version),
            last_backup: non_blank(state.last_backup),
            total_backups,
            disk_usage: disk.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            memory_usage: memory.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            platform: self.probe.platform(),
            timestamp: Utc::now(),
            error: if problems.is_empty() {
                None
            } else {
                Some(problems.join("; "))
            },
        };

        debug!(
            current_version = %status.current_version,
            total_backups = status.total_backups,
            degraded = status.is_degraded(),
            "Status computed"
        );

        status
    }
}

fn non_blank(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
