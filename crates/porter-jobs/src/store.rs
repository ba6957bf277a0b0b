//! Ticket-keyed job record store.
//!
//! Owned-state-per-ticket over a concurrent map. The worker is the only
//! writer while a record is `in_progress`; terminal writes from the worker
//! and the watchdog race by construction, so every mutation path checks
//! the current status first and refuses to re-open a terminal record.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use porter_core::error::AppError;
use porter_core::result::AppResult;
use porter_core::types::{JobRecord, JobStatus, Ticket};

/// In-memory, concurrent job record store.
#[derive(Debug, Default)]
pub struct JobStore {
    records: DashMap<Ticket, JobRecord>,
}

impl JobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Create the record for a ticket.
    ///
    /// A ticket whose previous job is still `in_progress` cannot be
    /// recreated; a terminal record is replaced by the new job.
    pub fn create(&self, ticket: Ticket, record: JobRecord) -> AppResult<()> {
        if let Some(existing) = self.records.get(&ticket) {
            if !existing.is_terminal() {
                return Err(AppError::conflict(
                    "A job with this credential is already in progress",
                ));
            }
        }
        self.records.insert(ticket, record);
        Ok(())
    }

    /// Read a ticket's record.
    ///
    /// The original file-backed store could expose a record mid-write, so
    /// readers retried on a transient parse failure instead of treating it
    /// as fatal. Map reads are atomic now, but the bounded retry is kept:
    /// it costs nothing and documents the invariant for any future
    /// storage swap.
    pub fn read(&self, ticket: &Ticket) -> AppResult<JobRecord> {
        for _ in 0..2 {
            if let Some(record) = self.records.get(ticket) {
                return Ok(record.clone());
            }
        }
        Err(AppError::invalid_ticket(format!(
            "Ticket '{ticket}' does not correspond to a job"
        )))
    }

    /// Apply `mutate` to an in-progress record.
    ///
    /// A no-op on terminal records: status is monotonic and nothing may
    /// write to a record after it has finished or failed.
    pub fn update<F>(&self, ticket: &Ticket, mutate: F) -> AppResult<()>
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut record = self.records.get_mut(ticket).ok_or_else(|| {
            AppError::invalid_ticket(format!("Ticket '{ticket}' does not correspond to a job"))
        })?;
        if record.is_terminal() {
            return Ok(());
        }
        mutate(&mut record);
        Ok(())
    }

    /// Move a record to a terminal state.
    ///
    /// Returns `false` without mutating when the record is already
    /// terminal, which makes the worker/watchdog completion race benign:
    /// the first terminal write wins and is never overwritten.
    pub fn finalize(
        &self,
        ticket: &Ticket,
        status: JobStatus,
        status_code: u16,
        message: impl Into<String>,
        expiration: Option<DateTime<Utc>>,
    ) -> AppResult<bool> {
        debug_assert!(status.is_terminal());
        let mut record = self.records.get_mut(ticket).ok_or_else(|| {
            AppError::invalid_ticket(format!("Ticket '{ticket}' does not correspond to a job"))
        })?;
        if record.is_terminal() {
            return Ok(false);
        }
        record.status = status;
        record.status_code = Some(status_code);
        record.message = message.into();
        if let Some(expiration) = expiration {
            record.expiration = expiration;
        }
        Ok(true)
    }
}
