//! Backup registry: the versions list derived from the backups directory
//!
//! Every call re-reads the directory. Nothing is cached, so the list is always
//! consistent with what is on disk at the time of the call.

use crate::error::CoreError;
use crate::models::VersionEntry;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace, warn};

/// Reader over a directory of backup artifacts
#[derive(Debug, Clone)]
pub struct BackupRegistry {
    backups_dir: PathBuf,
}

impl BackupRegistry {
    pub fn new(backups_dir: impl Into<PathBuf>) -> Self {
        Self {
            backups_dir: backups_dir.into(),
        }
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// List all artifacts, newest first
    ///
    /// Entries with equal creation times keep directory enumeration order,
    /// which the OS does not guarantee.
    pub async fn list_versions(&self) -> Result<Vec<VersionEntry>, CoreError> {
        let mut dir = tokio::fs::read_dir(&self.backups_dir)
            .await
            .map_err(|e| self.dir_error(e))?;

        let mut versions = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| self.dir_error(e))? {
            let path = entry.path();
            // Follows symlinks, like resolve()
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(m) => m,
                Err(e) => {
                    // Removed between readdir and stat, or a dangling link
                    trace!(path = %path.display(), error = %e, "Skipping vanished entry");
                    continue;
                }
            };

            if !metadata.is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(path = %path.display(), "Skipping non UTF-8 file name");
                continue;
            };

            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            versions.push(VersionEntry::from_file(name, path, metadata.len(), created));
        }

        // Stable sort: ties keep enumeration order
        versions.sort_by(|a, b| b.created.cmp(&a.created));

        debug!(
            dir = %self.backups_dir.display(),
            count = versions.len(),
            "Listed backup versions"
        );

        Ok(versions)
    }

    /// Number of artifacts currently on disk
    pub async fn count(&self) -> Result<usize, CoreError> {
        Ok(self.list_versions().await?.len())
    }

    /// Resolve a bare file name to an existing artifact path
    pub async fn resolve(&self, filename: &str) -> Result<PathBuf, CoreError> {
        validate_file_name(filename)?;

        let path = self.backups_dir.join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => Ok(path),
            Ok(_) => Err(CoreError::InvalidPath {
                path,
                reason: "not a regular file".to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CoreError::FileNotFound { path })
            }
            Err(e) => Err(CoreError::FileRead { path, source: e }),
        }
    }

    /// Delete one artifact
    pub async fn delete(&self, filename: &str) -> Result<(), CoreError> {
        let path = self.resolve(filename).await?;
        tokio::fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::FileNotFound { path: path.clone() }
            } else {
                CoreError::FileDelete {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;
        debug!(path = %path.display(), "Deleted backup");
        Ok(())
    }

    fn dir_error(&self, e: std::io::Error) -> CoreError {
        if e.kind() == std::io::ErrorKind::NotFound {
            CoreError::DirectoryNotFound {
                path: self.backups_dir.clone(),
            }
        } else {
            CoreError::DirectoryRead {
                path: self.backups_dir.clone(),
                source: e,
            }
        }
    }
}

/// Accept only a single normal path component
fn validate_file_name(filename: &str) -> Result<(), CoreError> {
    let invalid = |reason: &str| CoreError::InvalidPath {
        path: PathBuf::from(filename),
        reason: reason.to_string(),
    };

    if filename.trim().is_empty() {
        return Err(invalid("empty file name"));
    }
    if filename.contains('\0') {
        return Err(invalid("contains NUL byte"));
    }
    if filename.contains('/') || filename.contains('\\') {
        return Err(invalid("path separators are not allowed"));
    }

    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid("not a plain file name")),
    }
}
