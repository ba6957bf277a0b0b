//! The download pipeline.
//!
//! Fetches a resource from a source target, checks each file against the
//! hashes the source declared, packs the payload into a bag, and
//! serializes the bag into the zip the client later retrieves. Fixity
//! mismatches never fail the job; they are reported in the result and in
//! the final message.

use std::sync::Arc;

use serde_json::json;
use tokio::fs;

use porter_core::error::AppError;
use porter_core::result::AppResult;
use porter_core::traits::{DownloadPayload, TargetAdapter};
use porter_core::types::Ticket;
use porter_bagit::Bag;
use porter_jobs::{JobOutcome, JobStore};

use crate::message::{self, FixityTally};
use crate::workdir::{Workdir, safe_join};

/// One download job's inputs.
#[derive(Debug)]
pub struct DownloadJob {
    /// Record store the job publishes progress into.
    pub store: Arc<JobStore>,
    /// This ticket's working directory.
    pub workdir: Workdir,
    /// Source target.
    pub adapter: Arc<dyn TargetAdapter>,
    /// Credential for the source target.
    pub token: String,
    /// Resource to download.
    pub resource_id: String,
    /// Ticket of the job record.
    pub ticket: Ticket,
}

impl DownloadJob {
    /// Run the pipeline to completion.
    pub async fn run(self) -> AppResult<JobOutcome> {
        let payload = self.adapter.download(&self.token, &self.resource_id).await?;
        if payload.resources.is_empty() {
            return Err(AppError::validation(format!(
                "Resource '{}' contains no files to download",
                self.resource_id
            )));
        }

        // One unit per file plus one for packaging.
        let total = payload.resources.len() as u64 + 1;
        self.store.update(&self.ticket, |record| {
            record.total_units = total;
            record.units_completed = 0;
        })?;

        let (tally, file_reports) = self.materialize(&payload).await?;

        let zip_path = self.package().await?;
        self.store.update(&self.ticket, |record| {
            record.units_completed = total;
        })?;

        let zip_name = zip_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "bag.zip".to_string());
        let result = json!({
            "zip_name": zip_name,
            "source_username": payload.source_username,
            "files": file_reports,
            "failed_fixity": tally.failed,
        });
        self.store
            .update(&self.ticket, |record| record.result = Some(result))?;

        Ok(JobOutcome {
            status_code: 200,
            message: message::download_message(&tally),
        })
    }

    /// Write the payload to disk, checking fixity as each file lands.
    async fn materialize(
        &self,
        payload: &DownloadPayload,
    ) -> AppResult<(FixityTally, Vec<serde_json::Value>)> {
        let files_dir = self.workdir.files_dir();
        fs::create_dir_all(&files_dir).await?;

        let mut tally = FixityTally::default();
        let mut reports = Vec::with_capacity(payload.resources.len());

        for resource in &payload.resources {
            let fixity = porter_fixity::check(&resource.bytes, &resource.hashes);
            tally.record(&resource.relative_path, &fixity);
            reports.push(json!({
                "path": resource.relative_path,
                "fixity": fixity,
            }));

            let destination = safe_join(&files_dir, &resource.relative_path)?;
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&destination, &resource.bytes).await?;

            self.store
                .update(&self.ticket, |record| record.units_completed += 1)?;
        }

        // Empty source directories survive the round trip as empty dirs.
        for container in &payload.empty_containers {
            fs::create_dir_all(safe_join(&files_dir, container)?).await?;
        }

        Ok((tally, reports))
    }

    /// Pack the payload into a bag and serialize it to the result zip.
    async fn package(&self) -> AppResult<std::path::PathBuf> {
        let files_dir = self.workdir.files_dir();
        let bag_dir = self.workdir.bag_dir();
        let zip_path = self.workdir.zip_path();
        let zip_for_task = zip_path.clone();
        tokio::task::spawn_blocking(move || -> AppResult<()> {
            let bag = Bag::pack(&files_dir, &bag_dir)?;
            bag.into_zip(&zip_for_task)
        })
        .await
        .map_err(|e| AppError::internal(format!("Packaging task panicked: {e}")))??;
        Ok(zip_path)
    }
}
