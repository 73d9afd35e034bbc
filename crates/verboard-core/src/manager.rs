//! Version manager: the facade shared by the HTTP API, realtime channel and CLI
//!
//! Holds no cached data. Every read goes back to disk and every command goes
//! through the external scripts, then the outcome is pushed to the hub.

use crate::changelog;
use crate::config::ManagerConfig;
use crate::error::CoreError;
use crate::event::{Notification, NotificationLevel, ServerEvent, Topic};
use crate::executor::{CommandExecutor, ExecutorConfig};
use crate::hub::BroadcastHub;
use crate::models::{
    BackupRequest, BackupResult, Changelog, RestorePoint, SwitchResult, SystemStatus,
    VersionEntry,
};
use crate::probes::HostProbe;
use crate::registry::BackupRegistry;
use crate::restore_points::RestorePointReader;
use crate::status::StatusAggregator;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Central entry point for version management
pub struct VersionManager {
    config: ManagerConfig,

    registry: BackupRegistry,

    status: StatusAggregator,

    executor: CommandExecutor,

    restore_points: RestorePointReader,

    /// Realtime fan-out, shared with the transport layers
    hub: Arc<BroadcastHub>,
}

impl VersionManager {
    /// Build a manager with its own hub (token taken from the config)
    pub fn new(config: ManagerConfig) -> Self {
        let hub = Arc::new(BroadcastHub::new(config.auth_token.clone()));
        Self::with_hub(config, hub)
    }

    pub fn with_hub(config: ManagerConfig, hub: Arc<BroadcastHub>) -> Self {
        let registry = BackupRegistry::new(&config.backups_dir);
        let probe = HostProbe::new(&config.backups_dir).with_timeout(config.probe_timeout);
        let status = StatusAggregator::new(config.state_file.clone(), registry.clone(), probe);
        let executor = CommandExecutor::new(ExecutorConfig {
            shell: config.shell.clone(),
            backup_script: config.backup_script.clone(),
            switch_script: config.switch_script.clone(),
            working_dir: config.root_dir.clone(),
            timeout: config.command_timeout,
        });
        let restore_points = RestorePointReader::new(&config.root_dir);

        Self {
            config,
            registry,
            status,
            executor,
            restore_points,
            hub,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Create the backups directory if it is missing
    pub async fn ensure_layout(&self) -> Result<(), CoreError> {
        let dir = &self.config.backups_dir;
        if tokio::fs::metadata(dir).await.is_ok() {
            return Ok(());
        }
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| CoreError::DirectoryCreate {
                path: dir.clone(),
                source: e,
            })?;
        info!(path = %dir.display(), "Created backups directory");
        Ok(())
    }

    pub async fn status(&self) -> SystemStatus {
        self.status.get_status().await
    }

    pub async fn versions(&self) -> Result<Vec<VersionEntry>, CoreError> {
        self.registry.list_versions().await
    }

    /// Run the backup script, then push the new status
    ///
    /// The version list itself is republished by the file watcher once the
    /// new artifact lands in the backups directory.
    pub async fn create_backup(&self, request: BackupRequest) -> Result<BackupResult, CoreError> {
        match self
            .executor
            .run_backup(request.name.as_deref(), request.backup_type)
            .await
        {
            Ok(result) => {
                self.publish_status().await;
                self.notify(
                    NotificationLevel::Success,
                    format!("Backup created: {}", result.backup_name),
                );
                Ok(result)
            }
            Err(e @ CoreError::Validation { .. }) => Err(e),
            Err(e) => {
                self.notify(NotificationLevel::Error, e.to_string());
                Err(e)
            }
        }
    }

    /// Run the switch script, then push the new status
    pub async fn switch_version(&self, version: &str) -> Result<SwitchResult, CoreError> {
        match self.executor.run_switch(version).await {
            Ok(result) => {
                self.publish_status().await;
                self.notify(
                    NotificationLevel::Success,
                    format!("Switched to version {}", result.version),
                );
                Ok(result)
            }
            Err(e @ CoreError::Validation { .. }) => Err(e),
            Err(e) => {
                self.notify(NotificationLevel::Error, e.to_string());
                Err(e)
            }
        }
    }

    /// Delete one artifact; the watcher reports the changed list
    pub async fn delete_backup(&self, filename: &str) -> Result<(), CoreError> {
        self.registry.delete(filename).await?;
        self.notify(
            NotificationLevel::Info,
            format!("Backup deleted: {}", filename),
        );
        Ok(())
    }

    /// Validated on-disk location of an artifact, for downloads
    pub async fn backup_path(&self, filename: &str) -> Result<PathBuf, CoreError> {
        self.registry.resolve(filename).await
    }

    pub fn changelog(&self, version1: &str, version2: &str) -> Result<Changelog, CoreError> {
        changelog::generate(version1, version2)
    }

    pub async fn restore_points(&self) -> Vec<RestorePoint> {
        self.restore_points.list().await
    }

    /// Re-read the backups directory and publish `versions-updated`
    ///
    /// Returns the number of sessions reached, or `None` when the directory
    /// could not be read (reported as an error notification).
    pub async fn refresh_versions(&self) -> Option<usize> {
        match self.registry.list_versions().await {
            Ok(versions) => {
                let count = versions.len();
                let delivered = self
                    .hub
                    .publish(Topic::Backups, ServerEvent::VersionsUpdated(versions));
                debug!(count, delivered, "Published versions-updated");
                Some(delivered)
            }
            Err(e) => {
                warn!(error = %e, "Failed to refresh versions");
                self.notify(
                    NotificationLevel::Error,
                    format!("Failed to read backups: {}", e),
                );
                None
            }
        }
    }

    /// Publish a notification on the `notifications` topic
    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) -> usize {
        self.hub.publish(
            Topic::Notifications,
            ServerEvent::Notification(Notification::new(level, message)),
        )
    }

    async fn publish_status(&self) -> usize {
        if self.hub.subscriber_count(Topic::Monitoring) == 0 {
            return 0;
        }
        let status = self.status().await;
        self.hub
            .publish(Topic::Monitoring, ServerEvent::StatusUpdate(status))
    }

    /// Periodically push `status-update` to monitoring subscribers
    ///
    /// Status is only computed while someone is listening.
    pub fn spawn_status_publisher(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let delivered = manager.publish_status().await;
                if delivered > 0 {
                    debug!(delivered, "Published periodic status");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BackupType;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, VersionManager) {
        let dir = tempdir().unwrap();
        let config = ManagerConfig::from_root(dir.path());
        let manager = VersionManager::new(config);
        (dir, manager)
    }

    #[tokio::test]
    async fn test_ensure_layout_creates_backups_dir() {
        let (_dir, manager) = setup();
        assert!(!manager.config().backups_dir.exists());

        manager.ensure_layout().await.unwrap();
        assert!(manager.config().backups_dir.is_dir());

        // Idempotent
        manager.ensure_layout().await.unwrap();
        assert!(manager.versions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_versions_publishes_list() {
        let (_dir, manager) = setup();
        manager.ensure_layout().await.unwrap();
        std::fs::write(
            manager.config().backups_dir.join("installer_app_stable_v1.tar.gz"),
            vec![0u8; 1024],
        )
        .unwrap();

        let (_id, mut rx) = manager.hub().connect();
        assert_eq!(manager.refresh_versions().await, Some(1));

        match rx.recv().await.unwrap() {
            ServerEvent::VersionsUpdated(list) => {
                assert_eq!(list.len(), 1);
                assert_eq!(list[0].display_name, "app_stable_v1");
            }
            other => panic!("unexpected event {}", other.name()),
        }
    }

    #[tokio::test]
    async fn test_refresh_versions_reports_unreadable_dir() {
        let (_dir, manager) = setup();
        let (_id, mut rx) = manager.hub().connect();

        assert_eq!(manager.refresh_versions().await, None);
        match rx.recv().await.unwrap() {
            ServerEvent::Notification(n) => assert_eq!(n.level, NotificationLevel::Error),
            other => panic!("unexpected event {}", other.name()),
        }
    }

    #[tokio::test]
    async fn test_switch_validation_is_not_broadcast() {
        let (_dir, manager) = setup();
        let (_id, mut rx) = manager.hub().connect();

        assert!(matches!(
            manager.switch_version("  ").await,
            Err(CoreError::Validation { .. })
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_backup_validation_is_not_broadcast() {
        let (_dir, manager) = setup();
        let (_id, mut rx) = manager.hub().connect();

        let request = BackupRequest {
            name: Some("--force".to_string()),
            backup_type: BackupType::Manual,
        };
        assert!(matches!(
            manager.create_backup(request).await,
            Err(CoreError::Validation { .. })
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delete_rejects_traversal() {
        let (_dir, manager) = setup();
        manager.ensure_layout().await.unwrap();

        let err = manager.delete_backup("../state.json").await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidPath { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_backup_notifies_error() {
        let (dir, manager) = setup();
        let vm_dir = dir.path().join("version_manager");
        std::fs::create_dir_all(&vm_dir).unwrap();
        std::fs::write(vm_dir.join("backup.sh"), "echo 'disk full' >&2\nexit 3\n").unwrap();

        let (_id, mut rx) = manager.hub().connect();
        let err = manager
            .create_backup(BackupRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::BackupExecution {
                exit_code: Some(3),
                ..
            }
        ));

        match rx.recv().await.unwrap() {
            ServerEvent::Notification(n) => {
                assert_eq!(n.level, NotificationLevel::Error);
                assert!(n.message.contains("disk full"));
            }
            other => panic!("unexpected event {}", other.name()),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_switch_pushes_status_then_notification() {
        let (dir, manager) = setup();
        let vm_dir = dir.path().join("version_manager");
        std::fs::create_dir_all(&vm_dir).unwrap();
        std::fs::write(
            vm_dir.join("switch.sh"),
            "printf '{\"current_version\": \"%s\"}' \"$2\" > version_manager/state.json\n",
        )
        .unwrap();
        manager.ensure_layout().await.unwrap();

        let (_id, mut rx) = manager.hub().connect();
        let result = manager.switch_version("v2.1").await.unwrap();
        assert_eq!(result.version, "v2.1");

        match rx.recv().await.unwrap() {
            ServerEvent::StatusUpdate(status) => assert_eq!(status.current_version, "v2.1"),
            other => panic!("unexpected event {}", other.name()),
        }
        assert_eq!(rx.recv().await.unwrap().name(), "notification");
    }
}
