//! The upload pipeline.
//!
//! Accepts a client-provided zipped bag, validates it on the server before
//! any byte reaches the destination, then hands the payload to the
//! destination target and compares the hashes the destination reports
//! against the bag's own manifest. A bag that does not validate is
//! rejected with a structural error and nothing is uploaded.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use tokio::fs;

use porter_core::error::AppError;
use porter_core::result::AppResult;
use porter_core::traits::{DuplicatePolicy, TargetAdapter, UploadOutcome};
use porter_core::types::{FixityResult, HashAlgorithm, Ticket};
use porter_bagit::{Bag, ManifestEntry, extract_zip, validate};
use porter_jobs::{JobOutcome, JobStore};

use crate::message::{self, FixityTally};
use crate::workdir::Workdir;

/// Transient filesystem effects can make a freshly extracted bag read
/// incompletely; validation re-runs a bounded number of times before the
/// bag is declared bad.
const VALIDATION_ATTEMPTS: usize = 3;

/// One upload job's inputs.
#[derive(Debug)]
pub struct UploadJob {
    /// Record store the job publishes progress into.
    pub store: Arc<JobStore>,
    /// This ticket's working directory.
    pub workdir: Workdir,
    /// Destination target.
    pub adapter: Arc<dyn TargetAdapter>,
    /// Credential for the destination target.
    pub token: String,
    /// Existing container to upload into, or `None` for a new one.
    pub resource_id: Option<String>,
    /// The client-provided zipped bag.
    pub zip_bytes: Bytes,
    /// What to do with files that already exist on the destination.
    pub duplicate_policy: DuplicatePolicy,
    /// Ticket of the job record.
    pub ticket: Ticket,
}

impl UploadJob {
    /// Run the pipeline to completion.
    pub async fn run(self) -> AppResult<JobOutcome> {
        let bag = self.extract_and_validate().await?;
        let entries = {
            let bag = bag.clone();
            tokio::task::spawn_blocking(move || bag.manifest())
                .await
                .map_err(|e| AppError::internal(format!("Manifest task panicked: {e}")))??
        };

        // One unit per payload file plus one for validation, already done.
        let total = entries.len() as u64 + 1;
        self.store.update(&self.ticket, |record| {
            record.total_units = total;
            record.units_completed = 1;
        })?;

        let outcome = self
            .adapter
            .upload(
                &self.token,
                self.resource_id.as_deref(),
                &bag.data_dir(),
                HashAlgorithm::Sha512,
                self.duplicate_policy,
            )
            .await?;

        let tally = destination_fixity(&entries, &outcome);
        self.store.update(&self.ticket, |record| {
            record.units_completed = total;
            record.result = Some(json!({
                "project_id": outcome.project_id,
                "destination_username": outcome.destination_username,
                "resources_ignored": outcome.resources_ignored,
                "resources_updated": outcome.resources_updated,
                "failed_fixity": tally.failed,
            }));
        })?;

        Ok(JobOutcome {
            status_code: 200,
            message: message::upload_message(&tally),
        })
    }

    /// Extract the client zip and validate the bag it contains.
    async fn extract_and_validate(&self) -> AppResult<Bag> {
        let zip_path = self.workdir.path().join("incoming.zip");
        fs::write(&zip_path, &self.zip_bytes).await?;

        let incoming = self.workdir.incoming_dir();
        let extract_target = incoming.clone();
        tokio::task::spawn_blocking(move || extract_zip(&zip_path, &extract_target))
            .await
            .map_err(|e| AppError::internal(format!("Extraction task panicked: {e}")))??;

        let bag_root = locate_bag_root(&incoming).await?;
        tokio::task::spawn_blocking(move || -> AppResult<Bag> {
            let bag = Bag::open(&bag_root)?;
            for attempt in 1..=VALIDATION_ATTEMPTS {
                let report = validate(&bag)?;
                if report.is_valid() {
                    return Ok(bag);
                }
                if attempt == VALIDATION_ATTEMPTS {
                    return Err(AppError::structural(report.summary()));
                }
                tracing::debug!(attempt, "Bag validation failed, retrying");
            }
            unreachable!("validation loop returns on the last attempt")
        })
        .await
        .map_err(|e| AppError::internal(format!("Validation task panicked: {e}")))?
    }
}

/// Find the bag inside an extracted archive: either at the archive root
/// or inside a single top-level directory.
async fn locate_bag_root(extracted: &std::path::Path) -> AppResult<PathBuf> {
    if fs::try_exists(&extracted.join("bagit.txt")).await? {
        return Ok(extracted.to_path_buf());
    }

    let mut top_level = Vec::new();
    let mut entries = fs::read_dir(extracted).await?;
    while let Some(entry) = entries.next_entry().await? {
        top_level.push(entry.path());
    }
    if let [only] = top_level.as_slice() {
        // The lone entry may be a file; looking inside it would fail
        // with ENOTDIR rather than "not found".
        if fs::metadata(only).await?.is_dir() && fs::try_exists(&only.join("bagit.txt")).await? {
            return Ok(only.clone());
        }
    }

    Err(AppError::structural(
        "The uploaded archive does not contain a bag",
    ))
}

/// Compare the destination-reported hashes against the bag manifest.
fn destination_fixity(entries: &[ManifestEntry], outcome: &UploadOutcome) -> FixityTally {
    let mut tally = FixityTally::default();
    for entry in entries {
        // Manifest paths are bag-relative; the destination saw data/.
        let key = entry
            .relative_path
            .strip_prefix("data/")
            .unwrap_or(&entry.relative_path);
        let expected = entry.checksum(HashAlgorithm::Sha512);
        let reported = outcome.file_hashes.get(key).cloned().flatten();

        let result = match (expected, reported) {
            (Some(expected), Some(reported)) => {
                let matched = expected == reported;
                FixityResult {
                    hash_algorithm: Some(HashAlgorithm::Sha512),
                    source_hash: Some(expected.to_string()),
                    computed_hash: Some(reported),
                    fixity: Some(matched),
                    detail: if matched {
                        "Destination hash and the bag manifest matched.".to_string()
                    } else {
                        "Destination hash and the bag manifest do not match.".to_string()
                    },
                }
            }
            _ => FixityResult {
                hash_algorithm: None,
                source_hash: None,
                computed_hash: None,
                fixity: None,
                detail: "The destination reported no hash for this file.".to_string(),
            },
        };
        tally.record(&entry.relative_path, &result);
    }
    tally
}
