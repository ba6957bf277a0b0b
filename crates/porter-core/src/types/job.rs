//! Job record model.
//!
//! The serialized shape of [`JobRecord`] is a wire contract: it is the
//! single document polled by clients and the watchdog, and its field names
//! must remain stable across the download, upload, and transfer job kinds.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a job.
///
/// Transitions only `InProgress -> {Finished, Failed}`, never backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// The worker is still running.
    InProgress,
    /// The job completed and a full result is available.
    Finished,
    /// The job ended with a terminal error.
    Failed,
}

impl JobStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// The kind of work a ticket represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Download a resource from a source target.
    Download,
    /// Upload a client-provided archive to a destination target.
    Upload,
    /// Download from a source and upload to a destination in one job.
    Transfer,
}

/// Progress counters and outcome for one side of a transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    /// Status of this phase.
    pub status: JobStatus,
    /// Outcome code once the phase is terminal.
    pub status_code: Option<u16>,
    /// Human-readable phase message.
    pub message: String,
    /// Total work units for this phase.
    pub total_units: u64,
    /// Completed work units.
    pub units_completed: u64,
    /// Relative paths whose fixity check failed in this phase.
    pub failed_fixity: Vec<String>,
}

impl PhaseRecord {
    /// A fresh in-progress phase.
    pub fn in_progress(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::InProgress,
            status_code: None,
            message: message.into(),
            total_units: 0,
            units_completed: 0,
            failed_fixity: Vec::new(),
        }
    }
}

/// The durable state of one ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// What kind of job this ticket tracks.
    pub kind: JobKind,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Machine outcome code; `None` while in progress.
    pub status_code: Option<u16>,
    /// Human-readable status message.
    pub message: String,
    /// Identifier of the spawned worker; set at most once, after which a
    /// cancellation has a handle to signal.
    pub worker_id: Option<Uuid>,
    /// Total work units for percentage calculation.
    pub total_units: u64,
    /// Completed work units.
    pub units_completed: u64,
    /// Digest of the credential the job was created with. Polls compare
    /// against this persisted value.
    pub token_digest: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Absolute retention time after which an external sweep may reclaim
    /// the record and its artifacts.
    pub expiration: DateTime<Utc>,
    /// Download side of a transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<PhaseRecord>,
    /// Upload side of a transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<PhaseRecord>,
    /// Job-kind-specific result document, populated on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl JobRecord {
    /// Create a fresh in-progress record.
    pub fn in_progress(
        kind: JobKind,
        token_digest: impl Into<String>,
        message: impl Into<String>,
        retention: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            kind,
            status: JobStatus::InProgress,
            status_code: None,
            message: message.into(),
            worker_id: None,
            total_units: 0,
            units_completed: 0,
            token_digest: token_digest.into(),
            created_at: now,
            expiration: now + retention,
            download: None,
            upload: None,
            result: None,
        }
    }

    /// Whether the record is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Completion percentage.
    ///
    /// Clamped to 99 while in progress so polling clients can distinguish
    /// "almost done" from "done"; 100 is reserved for `Finished`.
    pub fn percent(&self) -> u8 {
        if self.status == JobStatus::Finished {
            return 100;
        }
        if self.total_units == 0 {
            return 0;
        }
        let rounded = (100 * self.units_completed + self.total_units / 2) / self.total_units;
        (rounded as u8).min(99)
    }
}
