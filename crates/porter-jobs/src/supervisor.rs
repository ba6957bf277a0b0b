//! Worker supervision.
//!
//! Each accepted job runs on its own task with a cancellation token the
//! worker observes at every suspension point; the token, not a process
//! kill, is how both user cancellation and the watchdog stop a job. The
//! supervisor records the worker's handle in the job record before the
//! worker can publish any progress, so a cancellation request always has
//! a handle to signal once the record shows one.

use std::future::Future;
use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use porter_core::config::jobs::JobsConfig;
use porter_core::result::AppResult;
use porter_core::types::{JobKind, JobStatus, Ticket};

use crate::store::JobStore;
use crate::watchdog;

/// Successful completion of a work function.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// Machine outcome code recorded on the finished record.
    pub status_code: u16,
    /// Human-readable final message.
    pub message: String,
}

/// Handle to a running worker, kept for later signaling.
#[derive(Debug, Clone)]
struct WorkerHandle {
    worker_id: Uuid,
    cancel: CancellationToken,
}

/// Starts job work functions and their paired watchdogs.
#[derive(Debug)]
pub struct WorkerSupervisor {
    store: Arc<JobStore>,
    handles: Arc<DashMap<Ticket, WorkerHandle>>,
    config: JobsConfig,
}

impl WorkerSupervisor {
    /// Create a supervisor over `store`.
    pub fn new(store: Arc<JobStore>, config: JobsConfig) -> Self {
        Self {
            store,
            handles: Arc::new(DashMap::new()),
            config,
        }
    }

    /// The job supervision configuration.
    pub fn config(&self) -> &JobsConfig {
        &self.config
    }

    /// Start `work` for `ticket` and exactly one paired watchdog.
    ///
    /// The worker handle is written into the job record before either task
    /// starts; this write happens-before any progress write by the worker.
    /// The worker must tolerate being signaled before it has produced any
    /// partial output.
    pub fn spawn<Fut>(&self, ticket: Ticket, work: Fut) -> AppResult<()>
    where
        Fut: Future<Output = AppResult<JobOutcome>> + Send + 'static,
    {
        let worker_id = Uuid::new_v4();
        let cancel = CancellationToken::new();

        self.store
            .update(&ticket, |record| record.worker_id = Some(worker_id))?;
        self.handles.insert(
            ticket.clone(),
            WorkerHandle {
                worker_id,
                cancel: cancel.clone(),
            },
        );

        let failed_retention = Duration::hours(self.config.failed_retention_hours as i64);

        let store = Arc::clone(&self.store);
        let handles = Arc::clone(&self.handles);
        let worker_ticket = ticket.clone();
        let worker_cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = worker_cancel.cancelled() => {
                    // The watchdog finalizes before cancelling, so this
                    // write only lands for user-initiated cancellation.
                    let kind = store
                        .read(&worker_ticket)
                        .map(|r| r.kind)
                        .unwrap_or(JobKind::Download);
                    let wrote = store.finalize(
                        &worker_ticket,
                        JobStatus::Failed,
                        499,
                        format!("{} was cancelled by the user", kind_label(kind)),
                        Some(Utc::now() + failed_retention),
                    );
                    if matches!(wrote, Ok(true)) {
                        tracing::info!(ticket = %worker_ticket, "Job cancelled by the user");
                    }
                }
                result = work => {
                    match result {
                        Ok(outcome) => {
                            let _ = store.finalize(
                                &worker_ticket,
                                JobStatus::Finished,
                                outcome.status_code,
                                outcome.message,
                                None,
                            );
                            tracing::info!(ticket = %worker_ticket, "Job finished");
                        }
                        Err(err) => {
                            let _ = store.finalize(
                                &worker_ticket,
                                JobStatus::Failed,
                                err.status_code(),
                                err.message.clone(),
                                Some(Utc::now() + failed_retention),
                            );
                            tracing::warn!(
                                ticket = %worker_ticket,
                                code = err.status_code(),
                                "Job failed: {}",
                                err.message
                            );
                        }
                    }
                }
            }
            // The record is terminal either way; the handle has nothing
            // left to signal.
            handles.remove(&worker_ticket);
        });

        let store = Arc::clone(&self.store);
        let watchdog_ticket = ticket;
        let deadline = std::time::Duration::from_secs(self.config.deadline_seconds);
        let poll = std::time::Duration::from_secs(self.config.watchdog_poll_seconds);
        tokio::spawn(async move {
            watchdog::supervise(store, watchdog_ticket, cancel, deadline, poll, failed_retention)
                .await;
        });

        Ok(())
    }

    /// The recorded worker id for a ticket, if the worker has started.
    pub fn worker_id(&self, ticket: &Ticket) -> Option<Uuid> {
        self.handles.get(ticket).map(|h| h.worker_id)
    }

    /// Signal a ticket's worker to stop. Returns `false` when no handle
    /// has been recorded yet.
    pub fn cancel(&self, ticket: &Ticket) -> bool {
        match self.handles.get(ticket) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

fn kind_label(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Download => "Download",
        JobKind::Upload => "Upload",
        JobKind::Transfer => "Transfer",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use porter_core::error::AppError;
    use porter_core::types::JobRecord;

    fn setup(config: JobsConfig) -> (Arc<JobStore>, WorkerSupervisor, Ticket) {
        let store = Arc::new(JobStore::new());
        let ticket = Ticket::for_download("token");
        store
            .create(
                ticket.clone(),
                JobRecord::in_progress(
                    JobKind::Download,
                    "digest",
                    "The server is processing the request.",
                    Duration::hours(120),
                ),
            )
            .expect("create");
        let supervisor = WorkerSupervisor::new(Arc::clone(&store), config);
        (store, supervisor, ticket)
    }

    async fn wait_terminal(store: &JobStore, ticket: &Ticket) -> porter_core::types::JobRecord {
        for _ in 0..200 {
            let record = store.read(ticket).expect("read");
            if record.is_terminal() {
                return record;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("job never reached a terminal state");
    }

    #[tokio::test]
    async fn test_successful_work_finishes_record() {
        let (store, supervisor, ticket) = setup(JobsConfig::default());
        supervisor
            .spawn(ticket.clone(), async {
                Ok(JobOutcome {
                    status_code: 200,
                    message: "Download successful".to_string(),
                })
            })
            .expect("spawn");

        let record = wait_terminal(&store, &ticket).await;
        assert_eq!(record.status, JobStatus::Finished);
        assert_eq!(record.status_code, Some(200));
        assert!(record.worker_id.is_some());
    }

    #[tokio::test]
    async fn test_failed_work_records_error_code() {
        let (store, supervisor, ticket) = setup(JobsConfig::default());
        supervisor
            .spawn(ticket.clone(), async {
                Err::<JobOutcome, _>(AppError::target("Token is invalid", 401))
            })
            .expect("spawn");

        let record = wait_terminal(&store, &ticket).await;
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.status_code, Some(401));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_worker() {
        let (store, supervisor, ticket) = setup(JobsConfig::default());
        supervisor
            .spawn(ticket.clone(), async {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                Ok(JobOutcome {
                    status_code: 200,
                    message: "never".to_string(),
                })
            })
            .expect("spawn");

        assert!(supervisor.cancel(&ticket));
        let record = wait_terminal(&store, &ticket).await;
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.status_code, Some(499));
        assert!(record.message.contains("cancelled by the user"));
    }

    #[tokio::test]
    async fn test_handle_is_released_after_completion() {
        let (store, supervisor, ticket) = setup(JobsConfig::default());
        supervisor
            .spawn(ticket.clone(), async {
                Ok(JobOutcome {
                    status_code: 200,
                    message: "Download successful".to_string(),
                })
            })
            .expect("spawn");

        wait_terminal(&store, &ticket).await;
        for _ in 0..200 {
            if supervisor.worker_id(&ticket).is_none() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(supervisor.worker_id(&ticket).is_none());
        assert!(!supervisor.cancel(&ticket));
    }

    #[tokio::test]
    async fn test_cancel_without_handle_reports_false() {
        let (_store, supervisor, _ticket) = setup(JobsConfig::default());
        assert!(!supervisor.cancel(&Ticket::for_download("other")));
    }

    #[tokio::test]
    async fn test_watchdog_times_out_hung_worker() {
        let config = JobsConfig {
            deadline_seconds: 0,
            watchdog_poll_seconds: 0,
            ..JobsConfig::default()
        };
        let (store, supervisor, ticket) = setup(config);
        supervisor
            .spawn(ticket.clone(), async {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                Ok(JobOutcome {
                    status_code: 200,
                    message: "never".to_string(),
                })
            })
            .expect("spawn");

        let record = wait_terminal(&store, &ticket).await;
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.status_code, Some(504));
        assert_eq!(record.message, crate::watchdog::TIMEOUT_MESSAGE);
    }
}
