//! End-to-end scenarios for the version manager
//!
//! Run with:
//! ```bash
//! cargo test -p verboard-core --test manager_scenarios
//! ```

use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc;
use tokio::time::timeout;
use verboard_core::models::{ArchiveFormat, ReleaseChannel, NOT_AVAILABLE};
use verboard_core::{FileWatcher, ManagerConfig, ServerEvent, VersionManager, WatcherConfig};

async fn manager_in(dir: &TempDir) -> Arc<VersionManager> {
    let mut config = ManagerConfig::from_root(dir.path());
    config.watcher = WatcherConfig {
        debounce_delay: Duration::from_millis(50),
        max_debounce_delay: Duration::from_millis(300),
        burst_threshold: 10,
    };
    let manager = Arc::new(VersionManager::new(config));
    manager.ensure_layout().await.unwrap();
    manager
}

/// Next `versions-updated` payload, skipping other events
async fn next_versions(
    rx: &mut mpsc::Receiver<ServerEvent>,
    wait: Duration,
) -> Option<Vec<verboard_core::models::VersionEntry>> {
    timeout(wait, async {
        while let Some(event) = rx.recv().await {
            if let ServerEvent::VersionsUpdated(list) = event {
                return Some(list);
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

#[tokio::test]
async fn test_listing_scenario() {
    let dir = tempdir().unwrap();
    let manager = manager_in(&dir).await;
    let backups = &manager.config().backups_dir;

    std::fs::write(backups.join("installer_app_stable_v1.tar.gz"), vec![0u8; 1024]).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    std::fs::write(backups.join("installer_app_beta_v2.zip"), vec![0u8; 2048]).unwrap();

    let versions = manager.versions().await.unwrap();
    assert_eq!(versions.len(), 2);

    assert_eq!(versions[0].display_name, "app_beta_v2");
    assert_eq!(versions[0].channel, ReleaseChannel::Beta);
    assert_eq!(versions[0].format, ArchiveFormat::Zip);
    assert_eq!(versions[0].size, "2 KB");

    assert_eq!(versions[1].display_name, "app_stable_v1");
    assert_eq!(versions[1].channel, ReleaseChannel::Stable);
    assert_eq!(versions[1].format, ArchiveFormat::TarGz);
    assert_eq!(versions[1].size, "1 KB");

    // Idempotent
    let again = manager.versions().await.unwrap();
    let names: Vec<_> = again.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(
        names,
        ["installer_app_beta_v2.zip", "installer_app_stable_v1.tar.gz"]
    );
}

#[tokio::test]
async fn test_status_without_state_file() {
    let dir = tempdir().unwrap();
    let manager = manager_in(&dir).await;
    std::fs::write(manager.config().backups_dir.join("a_stable.zip"), b"x").unwrap();

    let status = manager.status().await;
    assert_eq!(status.current_version, NOT_AVAILABLE);
    assert_eq!(status.total_backups, 1);
    assert!(status.error.is_some());
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_switch_leaves_state_untouched() {
    let dir = tempdir().unwrap();
    let manager = manager_in(&dir).await;

    let state_file = manager.config().state_file.clone();
    let original = r#"{"current_version": "v1.0", "last_backup": "2026-01-01"}"#;
    std::fs::write(&state_file, original).unwrap();
    std::fs::write(
        &manager.config().switch_script,
        "echo \"unknown version $2\" >&2\nexit 1\n",
    )
    .unwrap();

    let (_id, mut rx) = manager.hub().connect();
    let err = manager.switch_version("nonexistent").await.unwrap_err();
    assert!(err.to_string().contains("unknown version nonexistent"));

    assert_eq!(std::fs::read_to_string(&state_file).unwrap(), original);
    assert_eq!(manager.status().await.current_version, "v1.0");

    while let Ok(event) = rx.try_recv() {
        assert_ne!(event.name(), "switch-completed");
        assert_ne!(event.name(), "status-update");
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_backup_passes_arguments_to_script() {
    let dir = tempdir().unwrap();
    let manager = manager_in(&dir).await;
    std::fs::write(
        &manager.config().backup_script,
        "touch \"version_manager/backups/$2_$4.tar.gz\"\necho done\n",
    )
    .unwrap();

    let result = manager
        .create_backup(verboard_core::models::BackupRequest {
            name: Some("nightly".into()),
            backup_type: verboard_core::models::BackupType::Beta,
        })
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.backup_name, "nightly_beta");
    assert_eq!(result.output.trim(), "done");

    let versions = manager.versions().await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].name, "nightly_beta.tar.gz");
}

#[tokio::test]
async fn test_delete_produces_one_versions_update() {
    let dir = tempdir().unwrap();
    let manager = manager_in(&dir).await;
    let backups = manager.config().backups_dir.clone();
    std::fs::write(backups.join("installer_app_stable_v1.tar.gz"), b"one").unwrap();
    std::fs::write(backups.join("installer_app_beta_v2.zip"), b"two").unwrap();

    let watcher = FileWatcher::start(
        backups.clone(),
        Arc::clone(&manager),
        manager.config().watcher.clone(),
    )
    .await
    .unwrap();

    let (_id, mut rx) = manager.hub().connect();
    manager
        .delete_backup("installer_app_stable_v1.tar.gz")
        .await
        .unwrap();

    let list = next_versions(&mut rx, Duration::from_secs(5))
        .await
        .expect("versions-updated after delete");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].name, "installer_app_beta_v2.zip");

    // Exactly one broadcast for one delete
    assert!(next_versions(&mut rx, Duration::from_millis(600)).await.is_none());

    watcher.stop().await;
}

#[tokio::test]
async fn test_burst_of_creates_yields_consistent_list() {
    let dir = tempdir().unwrap();
    let manager = manager_in(&dir).await;
    let backups = manager.config().backups_dir.clone();

    let watcher = FileWatcher::start(
        backups.clone(),
        Arc::clone(&manager),
        manager.config().watcher.clone(),
    )
    .await
    .unwrap();
    let (_id, mut rx) = manager.hub().connect();

    for i in 0..5 {
        std::fs::write(backups.join(format!("b{}_beta.zip", i)), b"x").unwrap();
    }

    let mut last = Vec::new();
    while let Some(list) = next_versions(&mut rx, Duration::from_secs(2)).await {
        last = list;
        if last.len() == 5 {
            break;
        }
    }
    assert_eq!(last.len(), 5);

    watcher.stop().await;
}
