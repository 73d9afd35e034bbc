//! Changelog between two versions
//!
//! Placeholder: no diff engine exists. The response carries a fixed change
//! list and is flagged `placeholder: true` so clients never mistake it for
//! computed data.

use crate::error::CoreError;
use crate::models::Changelog;
use chrono::Utc;

const PLACEHOLDER_CHANGES: [&str; 3] = [
    "Web dashboard for backups and versions",
    "REST API for status, backups and version switching",
    "Real-time updates over WebSocket",
];

const PLACEHOLDER_NOTE: &str =
    "Static change list; differences between versions are not computed";

/// Build the changelog response for `version1..version2`
pub fn generate(version1: &str, version2: &str) -> Result<Changelog, CoreError> {
    let v1 = version1.trim();
    let v2 = version2.trim();

    if v1.is_empty() || v2.is_empty() {
        return Err(CoreError::validation("both versions are required"));
    }
    if v1 == v2 {
        return Err(CoreError::validation("versions must differ"));
    }

    Ok(Changelog {
        version1: v1.to_string(),
        version2: v2.to_string(),
        changes: PLACEHOLDER_CHANGES.iter().map(|c| c.to_string()).collect(),
        timestamp: Utc::now(),
        placeholder: true,
        note: Some(PLACEHOLDER_NOTE.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changelog_is_flagged_placeholder() {
        let log = generate("v1", "v2").unwrap();
        assert!(log.placeholder);
        assert_eq!(log.changes.len(), 3);
        assert!(log.note.is_some());

        // Same list regardless of input
        let other = generate("a", "b").unwrap();
        assert_eq!(log.changes, other.changes);
    }

    #[test]
    fn test_changelog_validation() {
        assert!(matches!(
            generate("v1", "v1"),
            Err(CoreError::Validation { .. })
        ));
        assert!(matches!(
            generate("", "v1"),
            Err(CoreError::Validation { .. })
        ));
        assert!(matches!(
            generate("v1", "  "),
            Err(CoreError::Validation { .. })
        ));
    }
}
