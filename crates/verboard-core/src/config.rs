//! Configuration for the version manager
//!
//! Defaults are derived from a single root directory (the managed
//! application's checkout). An optional TOML file can override any of them;
//! the binary then applies command-line/environment overrides on top.

use crate::error::CoreError;
use crate::watcher::WatcherConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Directory under the root holding scripts, state and backups
pub const MANAGER_DIR: &str = "version_manager";

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Root of the managed application (also searched for `.git`)
    pub root_dir: PathBuf,
    pub backups_dir: PathBuf,
    /// State document written by the scripts
    pub state_file: PathBuf,
    pub backup_script: PathBuf,
    pub switch_script: PathBuf,
    /// Interpreter for the scripts
    pub shell: String,
    pub command_timeout: Duration,
    pub probe_timeout: Duration,
    /// Shared token for realtime sessions; `None` leaves the channel open
    pub auth_token: Option<String>,
    /// Period of `status-update` pushes to monitoring subscribers
    pub status_interval: Option<Duration>,
    pub watcher: WatcherConfig,
}

impl ManagerConfig {
    /// Default layout: `<root>/version_manager/{backups,state.json,backup.sh,switch.sh}`
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root_dir = root.into();
        let vm_dir = root_dir.join(MANAGER_DIR);
        Self {
            backups_dir: vm_dir.join("backups"),
            state_file: vm_dir.join("state.json"),
            backup_script: vm_dir.join("backup.sh"),
            switch_script: vm_dir.join("switch.sh"),
            root_dir,
            shell: "bash".to_string(),
            command_timeout: Duration::from_secs(600),
            probe_timeout: Duration::from_secs(3),
            auth_token: None,
            status_interval: Some(Duration::from_secs(30)),
            watcher: WatcherConfig::default(),
        }
    }

    /// Overlay values from a config file; relative paths resolve against the root
    pub fn merge_file(mut self, file: FileConfig) -> Self {
        if let Some(root) = file.root {
            let rebased = Self::from_root(root);
            self = Self {
                shell: self.shell,
                command_timeout: self.command_timeout,
                probe_timeout: self.probe_timeout,
                auth_token: self.auth_token,
                status_interval: self.status_interval,
                watcher: self.watcher,
                ..rebased
            };
        }

        let root = self.root_dir.clone();
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { root.join(p) };

        if let Some(p) = file.backups_dir {
            self.backups_dir = resolve(p);
        }
        if let Some(p) = file.state_file {
            self.state_file = resolve(p);
        }
        if let Some(p) = file.backup_script {
            self.backup_script = resolve(p);
        }
        if let Some(p) = file.switch_script {
            self.switch_script = resolve(p);
        }
        if let Some(shell) = file.shell {
            self.shell = shell;
        }
        if let Some(secs) = file.command_timeout_secs {
            self.command_timeout = Duration::from_secs(secs);
        }
        if let Some(token) = file.auth_token {
            self.auth_token = Some(token);
        }
        if let Some(secs) = file.status_interval_secs {
            self.status_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(w) = file.watcher {
            if let Some(ms) = w.debounce_ms {
                self.watcher.debounce_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = w.max_debounce_ms {
                self.watcher.max_debounce_delay = Duration::from_millis(ms);
            }
            if let Some(n) = w.burst_threshold {
                self.watcher.burst_threshold = n;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.shell.trim().is_empty() {
            return Err(CoreError::InvalidConfig {
                message: "shell must not be empty".to_string(),
            });
        }
        if self.command_timeout.is_zero() {
            return Err(CoreError::InvalidConfig {
                message: "command timeout must be positive".to_string(),
            });
        }
        if self.watcher.max_debounce_delay < self.watcher.debounce_delay {
            return Err(CoreError::InvalidConfig {
                message: "watcher max debounce must be >= debounce".to_string(),
            });
        }
        if matches!(&self.auth_token, Some(t) if t.trim().is_empty()) {
            return Err(CoreError::InvalidConfig {
                message: "auth token must not be blank".to_string(),
            });
        }
        Ok(())
    }
}

/// On-disk configuration (`config.toml`); every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub root: Option<PathBuf>,
    pub backups_dir: Option<PathBuf>,
    pub state_file: Option<PathBuf>,
    pub backup_script: Option<PathBuf>,
    pub switch_script: Option<PathBuf>,
    pub shell: Option<String>,
    pub command_timeout_secs: Option<u64>,
    pub auth_token: Option<String>,
    /// 0 disables periodic status pushes
    pub status_interval_secs: Option<u64>,
    pub watcher: Option<WatcherFileConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatcherFileConfig {
    pub debounce_ms: Option<u64>,
    pub max_debounce_ms: Option<u64>,
    pub burst_threshold: Option<u32>,
}

impl FileConfig {
    /// Load a config file; `Ok(None)` when it does not exist
    pub fn load(path: &Path) -> Result<Option<Self>, CoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file");
                return Ok(None);
            }
            Err(e) => {
                return Err(CoreError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let parsed = toml::from_str(&content).map_err(|e| CoreError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(Some(parsed))
    }

    /// `<config dir>/verboard/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("verboard").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let cfg = ManagerConfig::from_root("/srv/app");
        assert_eq!(cfg.backups_dir, PathBuf::from("/srv/app/version_manager/backups"));
        assert_eq!(cfg.state_file, PathBuf::from("/srv/app/version_manager/state.json"));
        assert_eq!(cfg.backup_script, PathBuf::from("/srv/app/version_manager/backup.sh"));
        assert_eq!(cfg.shell, "bash");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_merge_file_resolves_relative_paths() {
        let file: FileConfig = toml::from_str(
            r#"
            state_file = "state/backup_state.json"
            backups_dir = "/mnt/backups"
            status_interval_secs = 0

            [watcher]
            debounce_ms = 200
            "#,
        )
        .unwrap();

        let cfg = ManagerConfig::from_root("/srv/app").merge_file(file);
        assert_eq!(cfg.state_file, PathBuf::from("/srv/app/state/backup_state.json"));
        assert_eq!(cfg.backups_dir, PathBuf::from("/mnt/backups"));
        assert!(cfg.status_interval.is_none());
        assert_eq!(cfg.watcher.debounce_delay, Duration::from_millis(200));
    }

    #[test]
    fn test_merge_file_root_rebases_defaults() {
        let file = FileConfig {
            root: Some(PathBuf::from("/opt/other")),
            shell: Some("sh".into()),
            ..Default::default()
        };
        let cfg = ManagerConfig::from_root("/srv/app").merge_file(file);
        assert_eq!(cfg.root_dir, PathBuf::from("/opt/other"));
        assert_eq!(cfg.switch_script, PathBuf::from("/opt/other/version_manager/switch.sh"));
        assert_eq!(cfg.shell, "sh");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let res = toml::from_str::<FileConfig>("colour = \"blue\"");
        assert!(res.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileConfig::load(&dir.path().join("none.toml")).unwrap().is_none());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "shell = [").unwrap();
        assert!(matches!(
            FileConfig::load(&path),
            Err(CoreError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_watcher() {
        let mut cfg = ManagerConfig::from_root("/srv/app");
        cfg.watcher.max_debounce_delay = Duration::from_millis(1);
        assert!(cfg.validate().is_err());
    }
}
