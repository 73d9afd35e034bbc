//! External command execution for backup and switch scripts
//!
//! Commands are always built as an argument vector and spawned directly,
//! never through a shell command string. Operator input reaches the scripts
//! as discrete arguments.

use crate::error::CoreError;
use crate::models::{BackupResult, BackupType, SwitchResult};
use chrono::{SecondsFormat, Utc};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Captured output of a finished process
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Best error text: stderr, falling back to stdout
    pub fn failure_text(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        self.stdout.trim().to_string()
    }
}

/// Run a program to completion with a timeout, capturing stdout and stderr
///
/// Spawn failures and timeouts become [`CoreError::CommandFailed`]. A non-zero
/// exit is NOT an error here; callers decide what it means.
pub async fn run_command<I, S>(
    program: &str,
    args: I,
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<CommandOutput, CoreError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(CoreError::CommandFailed {
                program: program.to_string(),
                message: format!("failed to spawn: {}", e),
            })
        }
        Err(_) => {
            return Err(CoreError::CommandFailed {
                program: program.to_string(),
                message: format!("timed out after {}s", timeout.as_secs()),
            })
        }
    };

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
    })
}

/// Configuration for the script executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Interpreter used to run the scripts
    pub shell: String,
    pub backup_script: PathBuf,
    pub switch_script: PathBuf,
    /// Working directory for script runs
    pub working_dir: PathBuf,
    /// Hard limit for one script run
    pub timeout: Duration,
}

/// Runs the external backup/switch scripts
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    config: ExecutorConfig,
}

impl CommandExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Create a backup via `<shell> <backup_script> --name <name> --type <type>`
    ///
    /// Not retried on failure: a partial backup may already exist.
    pub async fn run_backup(
        &self,
        name: Option<&str>,
        backup_type: BackupType,
    ) -> Result<BackupResult, CoreError> {
        let backup_name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(n) => {
                validate_argument("backup name", n)?;
                n.to_string()
            }
            None => default_backup_name(),
        };

        info!(name = %backup_name, backup_type = %backup_type, "Starting backup");

        let args = [
            self.config.backup_script.as_os_str(),
            OsStr::new("--name"),
            OsStr::new(&backup_name),
            OsStr::new("--type"),
            OsStr::new(backup_type.as_str()),
        ];

        let output = self
            .run_script(args)
            .await
            .map_err(|e| CoreError::BackupExecution {
                message: e.to_string(),
                exit_code: None,
            })?;

        if !output.success() {
            warn!(exit_code = ?output.exit_code, "Backup script failed");
            return Err(CoreError::BackupExecution {
                message: describe_failure(&output),
                exit_code: output.exit_code,
            });
        }

        info!(name = %backup_name, "Backup completed");

        Ok(BackupResult {
            success: true,
            message: "Backup created successfully".to_string(),
            backup_name: format!("{}_{}", backup_name, backup_type),
            output: output.stdout,
            timestamp: Utc::now(),
        })
    }

    /// Switch versions via `<shell> <switch_script> use <version>`
    pub async fn run_switch(&self, version: &str) -> Result<SwitchResult, CoreError> {
        let version = version.trim();
        if version.is_empty() {
            return Err(CoreError::validation("version is required"));
        }
        validate_argument("version", version)?;

        info!(version, "Switching version");

        let args = [
            self.config.switch_script.as_os_str(),
            OsStr::new("use"),
            OsStr::new(version),
        ];

        let output = self
            .run_script(args)
            .await
            .map_err(|e| CoreError::SwitchExecution {
                message: e.to_string(),
                exit_code: None,
            })?;

        if !output.success() {
            warn!(version, exit_code = ?output.exit_code, "Switch script failed");
            return Err(CoreError::SwitchExecution {
                message: describe_failure(&output),
                exit_code: output.exit_code,
            });
        }

        info!(version, "Switch completed");

        Ok(SwitchResult {
            success: true,
            message: format!("Switched to version: {}", version),
            version: version.to_string(),
            output: output.stdout,
            timestamp: Utc::now(),
        })
    }

    async fn run_script<const N: usize>(
        &self,
        args: [&OsStr; N],
    ) -> Result<CommandOutput, CoreError> {
        debug!(shell = %self.config.shell, ?args, "Spawning script");
        run_command(
            &self.config.shell,
            args,
            Some(&self.config.working_dir),
            self.config.timeout,
        )
        .await
    }
}

/// `backup_<RFC 3339 UTC>` with `:` and `.` replaced so it is file-name safe
fn default_backup_name() -> String {
    let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    format!("backup_{}", ts.replace([':', '.'], "-"))
}

/// Operator text must not look like an option or carry control characters
fn validate_argument(field: &str, value: &str) -> Result<(), CoreError> {
    if value.starts_with('-') {
        return Err(CoreError::validation(format!(
            "{} must not start with '-'",
            field
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(CoreError::validation(format!(
            "{} must not contain control characters",
            field
        )));
    }
    Ok(())
}

fn describe_failure(output: &CommandOutput) -> String {
    let status = match output.exit_code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    };
    let text = output.failure_text();
    if text.is_empty() {
        status
    } else {
        format!("{}: {}", status, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backup_name_is_file_safe() {
        let name = default_backup_name();
        assert!(name.starts_with("backup_"));
        assert!(!name.contains(':'));
        assert!(!name.contains('.'));
    }

    #[test]
    fn test_validate_argument() {
        assert!(validate_argument("name", "pre upgrade; rm -rf /").is_ok());
        assert!(validate_argument("name", "--type").is_err());
        assert!(validate_argument("name", "a\nb").is_err());
    }

    #[test]
    fn test_describe_failure_prefers_stderr() {
        let output = CommandOutput {
            stdout: "partial".into(),
            stderr: "no such version\n".into(),
            exit_code: Some(3),
        };
        assert_eq!(describe_failure(&output), "exit status 3: no such version");

        let output = CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
        };
        assert_eq!(describe_failure(&output), "terminated by signal");
    }

    #[tokio::test]
    async fn test_run_command_missing_program() {
        let err = run_command(
            "/definitely/not/a/program",
            ["x"],
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CoreError::CommandFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_captures_output() {
        let output = run_command("sh", ["-c", "echo out; echo err >&2; exit 4"], None, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert_eq!(output.exit_code, Some(4));
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_timeout() {
        let err = run_command("sleep", ["5"], None, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
