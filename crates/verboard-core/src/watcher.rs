//! File watcher for the backups directory
//!
//! Uses notify with a trailing adaptive debounce: every relevant event pushes
//! a quiet-period deadline forward, and once it passes the directory is
//! re-read a single time.

use crate::error::CoreError;
use crate::event::NotificationLevel;
use crate::manager::VersionManager;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, trace};

/// Configuration for the file watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Base quiet period
    pub debounce_delay: Duration,

    /// Quiet period during a burst, and the longest a refresh can be deferred
    pub max_debounce_delay: Duration,

    /// Burst detection threshold (events per second)
    pub burst_threshold: u32,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_delay: Duration::from_millis(500),
            max_debounce_delay: Duration::from_secs(3),
            burst_threshold: 10,
        }
    }
}

/// Watches the backups directory and republishes the version list
pub struct FileWatcher {
    _watcher: RecommendedWatcher,

    shutdown_tx: mpsc::Sender<()>,
}

impl FileWatcher {
    /// Start watching; the directory must exist
    pub async fn start(
        backups_dir: PathBuf,
        manager: Arc<VersionManager>,
        config: WatcherConfig,
    ) -> Result<Self, CoreError> {
        let (event_tx, mut event_rx) = mpsc::channel::<notify::Result<Event>>(100);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = event_tx.blocking_send(res);
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )
        .map_err(|e| watch_error("Failed to create watcher", e))?;
        watcher
            .watch(&backups_dir, RecursiveMode::NonRecursive)
            .map_err(|e| watch_error(&format!("Failed to watch {}", backups_dir.display()), e))?;

        info!(backups_dir = %backups_dir.display(), "File watcher started");

        tokio::spawn(async move {
            let mut debounce = DebounceState::new(config);

            loop {
                let deadline = debounce.deadline();

                tokio::select! {
                    Some(result) = event_rx.recv() => {
                        match result {
                            Ok(event) => {
                                if Self::is_relevant(&event) {
                                    trace!(kind = ?event.kind, paths = ?event.paths, "Backup directory changed");
                                    debounce.record(Instant::now());
                                }
                            }
                            Err(e) => {
                                let e = watch_error("Event delivery failed", e);
                                error!(error = %e, "File watcher error");
                                manager.notify(NotificationLevel::Error, e.to_string());
                            }
                        }
                    }
                    _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                        debounce.clear();
                        debug!("Quiet period elapsed, refreshing versions");
                        manager.refresh_versions().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("File watcher shutting down");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            shutdown_tx,
        })
    }

    /// Only entries appearing, disappearing or being renamed change the list
    fn is_relevant(event: &Event) -> bool {
        matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
        )
    }

    /// Stop the watcher
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

fn watch_error(context: &str, source: notify::Error) -> CoreError {
    CoreError::WatchError {
        message: format!("{}: {}", context, source),
        source: Some(source),
    }
}

/// Trailing debounce with burst-adaptive quiet period
struct DebounceState {
    config: WatcherConfig,
    event_count_window: VecDeque<Instant>,
    pending_since: Option<Instant>,
    deadline: Option<Instant>,
}

impl DebounceState {
    fn new(config: WatcherConfig) -> Self {
        Self {
            config,
            event_count_window: VecDeque::new(),
            pending_since: None,
            deadline: None,
        }
    }

    /// Register an event and return the new refresh deadline
    fn record(&mut self, now: Instant) -> Instant {
        self.event_count_window.push_back(now);
        while self
            .event_count_window
            .front()
            .map(|t| now.duration_since(*t) > Duration::from_secs(1))
            .unwrap_or(false)
        {
            self.event_count_window.pop_front();
        }

        let delay = if self.event_count_window.len() as u32 > self.config.burst_threshold {
            self.config.max_debounce_delay
        } else {
            self.config.debounce_delay
        };

        // A continuous stream of events must not starve the refresh
        let first = *self.pending_since.get_or_insert(now);
        let deadline = (now + delay).min(first + self.config.max_debounce_delay);

        self.deadline = Some(deadline);
        deadline
    }

    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn clear(&mut self) {
        self.pending_since = None;
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind, RenameMode};

    fn config() -> WatcherConfig {
        WatcherConfig {
            debounce_delay: Duration::from_millis(100),
            max_debounce_delay: Duration::from_millis(500),
            burst_threshold: 5,
        }
    }

    fn event(kind: EventKind) -> Event {
        Event {
            kind,
            paths: vec![PathBuf::from("/srv/app/version_manager/backups/a_stable.zip")],
            ..Default::default()
        }
    }

    #[test]
    fn test_relevant_event_kinds() {
        assert!(FileWatcher::is_relevant(&event(EventKind::Create(CreateKind::File))));
        assert!(FileWatcher::is_relevant(&event(EventKind::Remove(RemoveKind::File))));
        assert!(FileWatcher::is_relevant(&event(EventKind::Modify(
            ModifyKind::Name(RenameMode::Both)
        ))));

        assert!(!FileWatcher::is_relevant(&event(EventKind::Modify(
            ModifyKind::Data(DataChange::Content)
        ))));
        assert!(!FileWatcher::is_relevant(&event(EventKind::Access(
            notify::event::AccessKind::Any
        ))));
    }

    #[tokio::test]
    async fn test_start_on_missing_directory_is_watch_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(VersionManager::new(crate::ManagerConfig::from_root(
            dir.path(),
        )));
        let missing = dir.path().join("missing");

        let err = FileWatcher::start(missing, manager, config())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::WatchError { source: Some(_), .. }));
        assert_eq!(err.category(), crate::ErrorCategory::Internal);
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_debounce_is_trailing() {
        let mut state = DebounceState::new(config());
        let t0 = Instant::now();
        assert!(state.deadline().is_none());

        assert_eq!(state.record(t0), t0 + Duration::from_millis(100));

        // A later event pushes the deadline out
        let t1 = t0 + Duration::from_millis(50);
        assert_eq!(state.record(t1), t1 + Duration::from_millis(100));
        assert_eq!(state.deadline(), Some(t1 + Duration::from_millis(100)));

        state.clear();
        assert!(state.deadline().is_none());
    }

    #[test]
    fn test_burst_raises_delay() {
        let mut state = DebounceState::new(config());
        let t0 = Instant::now();

        let mut deadline = t0;
        for i in 0..7 {
            deadline = state.record(t0 + Duration::from_millis(i));
        }
        // Over threshold: quiet period is the max delay, capped from the first event
        assert_eq!(deadline, t0 + Duration::from_millis(500));
    }

    #[test]
    fn test_deadline_never_exceeds_max_from_first_event() {
        let mut state = DebounceState::new(config());
        let t0 = Instant::now();

        state.record(t0);
        let late = t0 + Duration::from_millis(450);
        assert_eq!(state.record(late), t0 + Duration::from_millis(500));
    }
}
