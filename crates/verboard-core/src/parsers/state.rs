//! State file parser with retry on parse failure

use crate::error::{CoreError, LoadError};
use crate::models::PersistedState;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Parser for the scripts' `state.json`
pub struct StateParser {
    /// Maximum retry attempts on parse failure
    max_retries: u32,
    /// Delay between retries
    retry_delay: Duration,
}

impl Default for StateParser {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_millis(50),
        }
    }
}

impl StateParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Parse the state file
    ///
    /// A missing file fails immediately. Parse errors are retried because the
    /// backup script may be halfway through rewriting the file.
    pub async fn parse(&self, path: &Path) -> Result<PersistedState, CoreError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(attempt, "Retrying state parse after delay");
                sleep(self.retry_delay).await;
            }

            match self.try_parse(path).await {
                Ok(state) => return Ok(state),
                Err(e @ CoreError::FileNotFound { .. }) => return Err(e),
                Err(e) => {
                    warn!(attempt, error = %e, "State parse attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::FileNotFound {
            path: path.to_path_buf(),
        }))
    }

    async fn try_parse(&self, path: &Path) -> Result<PersistedState, CoreError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                CoreError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        serde_json::from_str(&content).map_err(|e| CoreError::JsonParse {
            path: path.to_path_buf(),
            message: e.to_string(),
            source: e,
        })
    }

    /// Parse with graceful degradation
    ///
    /// Never fails: returns the default state plus the absorbed error.
    pub async fn parse_graceful(&self, path: &Path) -> (PersistedState, Option<LoadError>) {
        match self.parse(path).await {
            Ok(state) => (state, None),
            Err(e) => {
                let load_error = LoadError::from_core_error("state", &e);
                debug!(error = %load_error, "Falling back to default state");
                (PersistedState::default(), Some(load_error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorSeverity;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_parse_valid_state() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
            "current_version": "installer_app_stable_v1",
            "last_backup": "2026-03-01T10:00:00Z",
            "total_backups": 7,
            "backups": [{{"name": "installer_app_stable_v1.tar.gz"}}]
        }}"#
        )
        .unwrap();

        let state = StateParser::new().parse(file.path()).await.unwrap();
        assert_eq!(
            state.current_version.as_deref(),
            Some("installer_app_stable_v1")
        );
        assert_eq!(state.total_backups, Some(serde_json::json!(7)));
        assert_eq!(
            state.backups.and_then(|b| b.as_array().map(Vec::len)),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_parse_missing_file() {
        let parser = StateParser::new();
        let result = parser.parse(Path::new("/nonexistent/state.json")).await;
        assert!(matches!(result, Err(CoreError::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn test_parse_invalid_json_after_retries() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();

        let parser = StateParser::new().with_retries(1, Duration::from_millis(1));
        let result = parser.parse(file.path()).await;
        assert!(matches!(result, Err(CoreError::JsonParse { .. })));
    }

    #[tokio::test]
    async fn test_graceful_degrades_to_default() {
        let parser = StateParser::new();
        let (state, error) = parser
            .parse_graceful(Path::new("/nonexistent/state.json"))
            .await;
        assert_eq!(state, PersistedState::default());
        let error = error.unwrap();
        assert_eq!(error.source, "state");
        assert_eq!(error.severity, ErrorSeverity::Warning);
    }
}
