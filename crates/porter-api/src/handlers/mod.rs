//! Route handlers, one module per resource.

pub mod download;
pub mod health;
pub mod job;
pub mod targets;
pub mod transfer;
pub mod upload;

use std::future::Future;

use axum::Json;
use axum::http::StatusCode;
use chrono::{Duration, Utc};

use porter_core::result::AppResult;
use porter_core::types::{JobKind, JobRecord, JobStatus, Ticket};
use porter_jobs::JobOutcome;
use porter_pipeline::Workdir;

use crate::dto::{JobCreatedResponse, PROCESSING_MESSAGE};
use crate::error::ApiError;
use crate::state::AppState;

/// Create the job record, prepare the working directory, and hand the
/// work to the supervisor. The conflict check in `create` runs before any
/// filesystem work; a workdir failure finalizes the just-created record
/// so the ticket does not stay in progress forever.
pub(crate) async fn start_job<F, Fut>(
    state: &AppState,
    ticket: Ticket,
    kind: JobKind,
    token_digest: String,
    build: F,
) -> Result<(StatusCode, Json<JobCreatedResponse>), ApiError>
where
    F: FnOnce(Workdir) -> Fut,
    Fut: Future<Output = AppResult<JobOutcome>> + Send + 'static,
{
    let retention = Duration::hours(state.config.jobs.retention_hours as i64);
    let record = JobRecord::in_progress(kind, token_digest, PROCESSING_MESSAGE, retention);
    state.store.create(ticket.clone(), record)?;

    let workdir = match state.workdirs.prepare(&ticket).await {
        Ok(workdir) => workdir,
        Err(err) => {
            let expiration =
                Utc::now() + Duration::hours(state.config.jobs.failed_retention_hours as i64);
            let _ = state.store.finalize(
                &ticket,
                JobStatus::Failed,
                err.status_code(),
                err.message.clone(),
                Some(expiration),
            );
            return Err(err.into());
        }
    };

    state.supervisor.spawn(ticket.clone(), build(workdir))?;
    tracing::info!(ticket = %ticket, ?kind, "Accepted job");
    Ok((StatusCode::ACCEPTED, Json(JobCreatedResponse::new(&ticket))))
}
