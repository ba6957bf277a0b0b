//! Request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::json;

use porter_core::types::{JobRecord, JobStatus, Ticket};

/// Message shown while a job record has nothing more specific to say.
pub const PROCESSING_MESSAGE: &str = "The server is processing the request.";

/// Body of every `202 Accepted` job creation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreatedResponse {
    /// Ticket identifying the job.
    pub ticket_number: String,
    /// Initial status message.
    pub message: String,
    /// Path to poll for status.
    pub job_link: String,
}

impl JobCreatedResponse {
    /// Standard creation body for `ticket`.
    pub fn new(ticket: &Ticket) -> Self {
        Self {
            ticket_number: ticket.to_string(),
            message: PROCESSING_MESSAGE.to_string(),
            job_link: format!("/api/jobs/{ticket}"),
        }
    }
}

/// Body of `POST /api/transfers`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    /// Source target name.
    pub source_target: String,
    /// Resource to move off the source.
    pub source_resource_id: String,
    /// Destination target name.
    pub destination_target: String,
    /// Existing destination container, or absent for a new one.
    #[serde(default)]
    pub destination_resource_id: Option<String>,
    /// `"ignore"` or `"update"`; defaults to `"ignore"`.
    #[serde(default)]
    pub duplicate_policy: Option<String>,
}

/// Query parameters of the upload route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadParams {
    /// Existing destination container, or absent for a new one.
    #[serde(default)]
    pub resource_id: Option<String>,
    /// `"ignore"` or `"update"`; defaults to `"ignore"`.
    #[serde(default)]
    pub duplicate_policy: Option<String>,
}

/// The polled representation of a job record.
///
/// `result` appears only once the job has finished; failed jobs surface
/// their terminal code in `status_code` under an HTTP 500.
pub fn status_body(record: &JobRecord) -> serde_json::Value {
    let mut body = json!({
        "kind": record.kind,
        "status": record.status,
        "status_code": record.status_code,
        "message": record.message,
        "percent_complete": record.percent(),
        "created_at": record.created_at,
        "expiration": record.expiration,
    });
    if let Some(download) = &record.download {
        body["download"] = json!(download);
    }
    if let Some(upload) = &record.upload {
        body["upload"] = json!(upload);
    }
    if record.status == JobStatus::Finished {
        body["result"] = record.result.clone().unwrap_or(serde_json::Value::Null);
    }
    body
}
