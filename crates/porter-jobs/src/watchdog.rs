//! Deadline enforcement.
//!
//! One watchdog runs per ticket, started atomically with the worker. It is
//! the system's only hang-detection mechanism; workers are never trusted
//! to self-terminate reliably.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use porter_core::types::{JobStatus, Ticket};

use crate::store::JobStore;

/// Message recorded when the watchdog kills a job.
pub const TIMEOUT_MESSAGE: &str = "The process took too long on the server.";

/// Poll the job record until the job leaves `in_progress` or exceeds
/// `deadline`; in the latter case, finalize the record as failed with 504
/// and cancel the worker.
///
/// The terminal write goes through [`JobStore::finalize`], which is a
/// no-op when the worker completed first; the race is benign.
pub async fn supervise(
    store: Arc<JobStore>,
    ticket: Ticket,
    cancel: CancellationToken,
    deadline: Duration,
    poll_interval: Duration,
    failed_retention: chrono::Duration,
) {
    let started = Instant::now();

    loop {
        tokio::time::sleep(poll_interval).await;

        let record = match store.read(&ticket) {
            Ok(record) => record,
            Err(_) => {
                // Record reclaimed out from under us; nothing to guard.
                return;
            }
        };
        if record.is_terminal() {
            return;
        }

        if started.elapsed() >= deadline {
            let wrote = store.finalize(
                &ticket,
                JobStatus::Failed,
                504,
                TIMEOUT_MESSAGE,
                Some(Utc::now() + failed_retention),
            );
            if matches!(wrote, Ok(true)) {
                tracing::warn!(
                    ticket = %ticket,
                    elapsed_secs = started.elapsed().as_secs(),
                    "Watchdog terminated job past its deadline"
                );
            }
            cancel.cancel();
            return;
        }
    }
}
