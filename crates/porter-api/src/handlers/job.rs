//! Job status, artifact retrieval, and cancellation.

use std::time::Duration;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokio_util::io::ReaderStream;

use porter_core::error::AppError;
use porter_core::types::{JobKind, JobRecord, JobStatus, Ticket, token_digest};

use crate::dto::status_body;
use crate::error::ApiError;
use crate::extract::{
    DESTINATION_TOKEN_HEADER, SOURCE_TOKEN_HEADER, TOKEN_HEADER, require_token, transfer_digest,
};
use crate::state::AppState;

/// Compare the caller's tokens against the digest persisted at creation.
/// The persisted value is authoritative; the ticket in the URL is never
/// re-derived from the tokens.
fn authorize(record: &JobRecord, headers: &HeaderMap) -> Result<(), ApiError> {
    let digest = match record.kind {
        JobKind::Download | JobKind::Upload => token_digest(&require_token(headers, TOKEN_HEADER)?),
        JobKind::Transfer => transfer_digest(
            &require_token(headers, SOURCE_TOKEN_HEADER)?,
            &require_token(headers, DESTINATION_TOKEN_HEADER)?,
        ),
    };
    if digest != record.token_digest {
        return Err(AppError::unauthorized("The provided token does not match this job").into());
    }
    Ok(())
}

/// `GET /api/jobs/{ticket}`
///
/// 202 while in progress, 200 once finished, 500 once failed; the body
/// always carries the full record including the terminal outcome code.
pub async fn get_status(
    State(state): State<AppState>,
    Path(ticket): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ticket = Ticket::from_string(ticket);
    let record = state.store.read(&ticket)?;
    authorize(&record, &headers)?;

    let http_status = match record.status {
        JobStatus::InProgress => StatusCode::ACCEPTED,
        JobStatus::Finished => StatusCode::OK,
        JobStatus::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Ok((http_status, Json(status_body(&record))).into_response())
}

/// `GET /api/jobs/{ticket}/download`
///
/// Streams the finished job's zipped bag. Download jobs always have one;
/// transfer jobs only when the destination is flat and the pipeline
/// produced an archive.
pub async fn get_artifact(
    State(state): State<AppState>,
    Path(ticket): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ticket = Ticket::from_string(ticket);
    let record = state.store.read(&ticket)?;
    authorize(&record, &headers)?;

    if record.kind == JobKind::Upload {
        return Err(AppError::not_acceptable("This job has no downloadable artifact").into());
    }
    match record.status {
        JobStatus::Finished => {}
        JobStatus::InProgress => {
            return Err(AppError::not_acceptable("The job has not finished yet").into());
        }
        JobStatus::Failed => {
            return Err(AppError::not_acceptable("The job failed and has no artifact").into());
        }
    }

    let recorded_zip_name = record
        .result
        .as_ref()
        .and_then(|r| r.get("zip_name"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let workdir = state.workdirs.existing(&ticket);
    let (zip_path, zip_name) = match record.kind {
        JobKind::Download => (
            workdir.zip_path(),
            recorded_zip_name.unwrap_or_else(|| "bag.zip".to_string()),
        ),
        JobKind::Transfer => {
            let Some(name) = recorded_zip_name else {
                return Err(AppError::not_acceptable(
                    "This transfer delivered a directory tree and has no downloadable artifact",
                )
                .into());
            };
            (workdir.outgoing_dir().join(&name), name)
        }
        // Rejected above; repeated here so the match stays total.
        JobKind::Upload => {
            return Err(AppError::not_acceptable("This job has no downloadable artifact").into());
        }
    };

    let file = tokio::fs::File::open(&zip_path).await.map_err(|_| {
        AppError::gone("The job's artifact has expired and is no longer available")
    })?;

    let body = Body::from_stream(ReaderStream::new(file));
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{zip_name}\""),
        )
        .body(body)
        .map_err(|e| AppError::internal(format!("Failed to build artifact response: {e}")))?;
    Ok(response)
}

/// `PATCH /api/jobs/{ticket}`
///
/// Cancel a running job. The worker handle is written into the record
/// before the worker starts, but the write and this request race, so the
/// handle is polled for a bounded window before giving up.
pub async fn cancel(
    State(state): State<AppState>,
    Path(ticket): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ticket = Ticket::from_string(ticket);
    let record = state.store.read(&ticket)?;
    authorize(&record, &headers)?;

    if record.is_terminal() {
        let body = json!({
            "message": "The job has already completed and cannot be cancelled",
            "job": status_body(&record),
        });
        return Ok((StatusCode::NOT_ACCEPTABLE, Json(body)).into_response());
    }

    let attempts = state.config.jobs.cancel_poll_attempts;
    let delay = Duration::from_millis(state.config.jobs.cancel_poll_millis);

    let mut signaled = false;
    for _ in 0..attempts {
        if state.supervisor.cancel(&ticket) {
            signaled = true;
            break;
        }
        tokio::time::sleep(delay).await;
    }
    if !signaled {
        return Err(AppError::internal(
            "The job's worker never became available for cancellation",
        )
        .into());
    }

    for _ in 0..attempts {
        let record = state.store.read(&ticket)?;
        if record.is_terminal() {
            tracing::info!(ticket = %ticket, "Cancellation completed");
            return Ok((StatusCode::OK, Json(status_body(&record))).into_response());
        }
        tokio::time::sleep(delay).await;
    }

    Err(AppError::timeout("The job did not stop within the cancellation window").into())
}
