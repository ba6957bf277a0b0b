//! The transfer provenance log.
//!
//! Every transferred project carries a `porter_fts_metadata.json` document
//! listing each transfer that produced or moved it. The log is append-only:
//! a transfer holds the source's copy aside during download, appends its
//! own action, and uploads the merged document back. A held copy that does
//! not parse is replaced by a fresh log rather than failing the job; the
//! final message tells the user the history was reset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// File name of the provenance log on every target.
pub const METADATA_FILE_NAME: &str = "porter_fts_metadata.json";

/// One recorded transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEntry {
    /// Unique identifier of this action.
    pub id: Uuid,
    /// When the transfer completed its upload.
    pub date: DateTime<Utc>,
    /// Name of the source target.
    pub source_target: String,
    /// Username on the source, when the source reported one.
    pub source_username: Option<String>,
    /// Resource identifier on the source.
    pub source_resource: String,
    /// Name of the destination target.
    pub destination_target: String,
    /// Username on the destination, when it reported one.
    pub destination_username: Option<String>,
    /// Container that received the upload, when the destination named one.
    pub destination_resource: Option<String>,
    /// Number of payload files moved.
    pub files_transferred: u64,
}

/// The full provenance log document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferLog {
    /// Recorded transfers, oldest first.
    pub actions: Vec<ActionEntry>,
}

/// Whether a payload-relative path is the provenance log itself.
pub fn is_metadata_file(relative_path: &str) -> bool {
    relative_path
        .rsplit('/')
        .next()
        .is_some_and(|name| name == METADATA_FILE_NAME)
}

/// Append `entry` to the log held aside from the source.
///
/// Returns the merged log and whether the held document was usable. A
/// missing document is a fresh, valid log; a malformed one starts over and
/// is reported as invalid so the outcome message can say so.
pub fn merge(held: Option<&[u8]>, entry: ActionEntry) -> (TransferLog, bool) {
    let (mut log, valid) = match held {
        None => (TransferLog::default(), true),
        Some(bytes) => match serde_json::from_slice::<TransferLog>(bytes) {
            Ok(log) => (log, true),
            Err(err) => {
                tracing::warn!("Held transfer metadata is invalid, starting a fresh log: {err}");
                (TransferLog::default(), false)
            }
        },
    };
    log.actions.push(entry);
    (log, valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ActionEntry {
        ActionEntry {
            id: Uuid::new_v4(),
            date: Utc::now(),
            source_target: "osf".to_string(),
            source_username: Some("alice".to_string()),
            source_resource: "abc123".to_string(),
            destination_target: "zenodo".to_string(),
            destination_username: None,
            destination_resource: Some("dep-1".to_string()),
            files_transferred: 3,
        }
    }

    #[test]
    fn test_detects_metadata_file_at_any_depth() {
        assert!(is_metadata_file("porter_fts_metadata.json"));
        assert!(is_metadata_file("project/porter_fts_metadata.json"));
        assert!(!is_metadata_file("project/readme.json"));
        assert!(!is_metadata_file("project/porter_fts_metadata.json.bak"));
    }

    #[test]
    fn test_merge_without_held_document_starts_fresh() {
        let (log, valid) = merge(None, entry());
        assert!(valid);
        assert_eq!(log.actions.len(), 1);
    }

    #[test]
    fn test_merge_appends_to_held_document() {
        let (first, _) = merge(None, entry());
        let held = serde_json::to_vec(&first).expect("serialize");
        let (second, valid) = merge(Some(&held), entry());
        assert!(valid);
        assert_eq!(second.actions.len(), 2);
        assert_eq!(second.actions[0].id, first.actions[0].id);
    }

    #[test]
    fn test_malformed_held_document_starts_over_as_invalid() {
        let (log, valid) = merge(Some(b"{not json"), entry());
        assert!(!valid);
        assert_eq!(log.actions.len(), 1);
    }
}
