//! Error types for verboard-core
//!
//! Provides an error hierarchy with thiserror. Recoverable conditions (missing
//! state file, failed probe) are absorbed into [`LoadError`] records at the
//! point of origin; command failures propagate as [`CoreError`].

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for verboard operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // IO Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete file: {path}")]
    FileDelete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Failed to read directory: {path}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory: {path}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===================
    // Parse Errors
    // ===================
    #[error("Failed to parse JSON in {path}: {message}")]
    JsonParse {
        path: PathBuf,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    // ===================
    // External Commands
    // ===================
    #[error("Backup failed: {message}")]
    BackupExecution {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Switch failed: {message}")]
    SwitchExecution {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Command `{program}` failed: {message}")]
    CommandFailed { program: String, message: String },

    // ===================
    // Validation
    // ===================
    #[error("{message}")]
    Validation { message: String },

    #[error("Invalid path: {path} - {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    // ===================
    // Realtime sessions
    // ===================
    #[error("Authentication required")]
    Unauthorized,

    #[error("Unknown session: {session_id}")]
    UnknownSession { session_id: String },

    // ===================
    // Watch / Config
    // ===================
    #[error("File watcher error: {message}")]
    WatchError {
        message: String,
        #[source]
        source: Option<notify::Error>,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Coarse error taxonomy used by the API and realtime layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Parse,
    ExternalCommand,
    Validation,
    Auth,
    Internal,
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::FileRead { .. }
            | CoreError::FileDelete { .. }
            | CoreError::FileNotFound { .. }
            | CoreError::DirectoryNotFound { .. }
            | CoreError::DirectoryRead { .. }
            | CoreError::DirectoryCreate { .. } => ErrorCategory::Io,
            CoreError::JsonParse { .. } | CoreError::ConfigParse { .. } => ErrorCategory::Parse,
            CoreError::BackupExecution { .. }
            | CoreError::SwitchExecution { .. }
            | CoreError::CommandFailed { .. } => ErrorCategory::ExternalCommand,
            CoreError::Validation { .. } | CoreError::InvalidPath { .. } => {
                ErrorCategory::Validation
            }
            CoreError::Unauthorized | CoreError::UnknownSession { .. } => ErrorCategory::Auth,
            CoreError::WatchError { .. } | CoreError::InvalidConfig { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    /// True for "the thing asked for does not exist"
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::FileNotFound { .. })
    }
}

/// Severity level for absorbed errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Non-critical, can continue with degraded functionality
    Warning,
    /// Significant but not fatal
    Error,
}

/// An error absorbed at its point of origin
#[derive(Debug, Clone)]
pub struct LoadError {
    pub source: String,
    pub message: String,
    pub severity: ErrorSeverity,
    /// Actionable suggestion for the operator (optional)
    pub suggestion: Option<String>,
}

impl LoadError {
    /// Create an operator-facing error from CoreError with context-aware suggestions
    pub fn from_core_error(source: impl Into<String>, error: &CoreError) -> Self {
        let source = source.into();
        let (message, suggestion, severity) = match error {
            CoreError::FileNotFound { path } => (
                format!("File not found: {}", path.display()),
                Some("The backup scripts create it on their first run".to_string()),
                ErrorSeverity::Warning,
            ),
            CoreError::FileRead { path, .. } => (
                format!("Cannot read file: {}", path.display()),
                Some(format!("Check permissions: chmod +r {}", path.display())),
                ErrorSeverity::Error,
            ),
            CoreError::DirectoryNotFound { path } => (
                format!("Directory not found: {}", path.display()),
                Some(format!("Create directory: mkdir -p {}", path.display())),
                ErrorSeverity::Error,
            ),
            CoreError::JsonParse { path, message, .. } => (
                format!("Invalid JSON in {}: {}", path.display(), message),
                Some("Validate JSON syntax with: jq . <file>".to_string()),
                ErrorSeverity::Error,
            ),
            _ => (error.to_string(), None, ErrorSeverity::Error),
        };

        Self {
            source,
            message,
            severity,
            suggestion,
        }
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}
