//! Restore points from revision-control tags

use crate::executor::run_command;
use crate::models::RestorePoint;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

const TAG_FORMAT: &str = "--format=%(refname:short)%09%(creatordate:iso-strict)";

/// Lists git tags of the managed application's repository
#[derive(Debug, Clone)]
pub struct RestorePointReader {
    repo_root: PathBuf,
    timeout: Duration,
}

impl RestorePointReader {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Tags newest first; empty when there is no repository or git fails
    pub async fn list(&self) -> Vec<RestorePoint> {
        if !self.repo_root.join(".git").exists() {
            debug!(root = %self.repo_root.display(), "No git repository, no restore points");
            return Vec::new();
        }

        let args = [
            "for-each-ref",
            "--sort=-creatordate",
            TAG_FORMAT,
            "refs/tags",
        ];
        match run_command("git", args, Some(&self.repo_root), self.timeout).await {
            Ok(output) if output.success() => parse_tag_listing(&output.stdout),
            Ok(output) => {
                warn!(error = %output.failure_text(), "git tag listing failed");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "git unavailable");
                Vec::new()
            }
        }
    }
}

/// Parse `name<TAB>date` lines; the date column is optional
pub fn parse_tag_listing(stdout: &str) -> Vec<RestorePoint> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(2, '\t');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let timestamp = parts
                .next()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc));
            Some(RestorePoint::git_tag(name, timestamp))
        })
        .collect()
}
