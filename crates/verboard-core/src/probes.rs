//! Host resource probes (disk, memory, platform)
//!
//! Shells out to `df` and `free` and parses their text output. Every probe is
//! independent and returns `None` on any failure so the status aggregator can
//! fill in "N/A" field by field.

use crate::executor::run_command;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Probes run against the volume holding `target_dir`
#[derive(Debug, Clone)]
pub struct HostProbe {
    target_dir: PathBuf,
    timeout: Duration,
}

impl HostProbe {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            timeout: Duration::from_secs(3),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `df -h <dir>` data line, whitespace normalised
    pub async fn disk_usage(&self) -> Option<String> {
        let dir = existing_ancestor(&self.target_dir);
        let output = run_command("df", [Path::new("-h"), dir], None, self.timeout)
            .await
            .inspect_err(|e| debug!(error = %e, "Disk probe failed"))
            .ok()?;
        if !output.success() {
            debug!(exit_code = ?output.exit_code, "df exited with failure");
            return None;
        }
        parse_df_output(&output.stdout)
    }

    /// Used memory from `free -m`, e.g. "812 MB used"
    pub async fn memory_usage(&self) -> Option<String> {
        let output = run_command("free", ["-m"], None, self.timeout)
            .await
            .inspect_err(|e| debug!(error = %e, "Memory probe failed"))
            .ok()?;
        if !output.success() {
            debug!(exit_code = ?output.exit_code, "free exited with failure");
            return None;
        }
        parse_free_output(&output.stdout)
    }

    /// OS identifier (`linux`, `macos`, `windows`, ...)
    pub fn platform(&self) -> String {
        std::env::consts::OS.to_string()
    }
}

/// `df` fails on paths that do not exist yet; walk up to one that does
fn existing_ancestor(path: &Path) -> &Path {
    path.ancestors()
        .find(|p| !p.as_os_str().is_empty() && p.exists())
        .unwrap_or(Path::new("."))
}

/// Last non-empty line of `df` output with columns joined by single spaces
pub fn parse_df_output(stdout: &str) -> Option<String> {
    let mut lines = stdout.lines().filter(|l| !l.trim().is_empty());
    // header line must be there for the output to be meaningful
    lines.next()?;
    let last = lines.last()?;
    Some(last.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Third column of the `Mem:` row of `free -m`
pub fn parse_free_output(stdout: &str) -> Option<String> {
    let line = stdout
        .lines()
        .find(|l| l.trim_start().starts_with("Mem:"))?;
    let used = line.split_whitespace().nth(2)?;
    let used: u64 = used.parse().ok()?;
    Some(format!("{} MB used", used))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DF: &str = "\
Filesystem      Size  Used Avail Use% Mounted on
/dev/nvme0n1p2  468G  201G  244G  46% /
";

    const DF_WRAPPED: &str = "\
Filesystem            Size  Used Avail Use% Mounted on
/dev/mapper/vg-root
                      100G   40G   60G  40% /srv
";

    const FREE: &str = "\
               total        used        free      shared  buff/cache   available
Mem:           15875        6021        1204         912        8649        8571
Swap:           2047          12        2035
";

    #[test]
    fn test_parse_df() {
        assert_eq!(
            parse_df_output(DF).as_deref(),
            Some("/dev/nvme0n1p2 468G 201G 244G 46% /")
        );
        assert_eq!(
            parse_df_output(DF_WRAPPED).as_deref(),
            Some("100G 40G 60G 40% /srv")
        );
        assert_eq!(parse_df_output(""), None);
        assert_eq!(parse_df_output("Filesystem Size\n"), None);
    }

    #[test]
    fn test_parse_free() {
        assert_eq!(parse_free_output(FREE).as_deref(), Some("6021 MB used"));
        assert_eq!(parse_free_output("garbage"), None);
        assert_eq!(parse_free_output("Mem: 100 lots 3"), None);
    }

    #[test]
    fn test_existing_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("a/b/c");
        assert_eq!(existing_ancestor(&missing), dir.path());
    }

    #[test]
    fn test_platform_identifier() {
        let probe = HostProbe::new(".");
        assert_eq!(probe.platform(), std::env::consts::OS);
    }
}
