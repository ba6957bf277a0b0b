//! The transfer pipeline.
//!
//! Moves a resource from a source target to a destination target in one
//! job: download with fixity checks against the source, package when the
//! destination cannot hold a nested tree, upload with fixity checks
//! against hashes computed during the download, then merge and re-upload
//! the provenance log. The job record carries a phase record per side so
//! polling clients can see which half of the transfer is running.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::fs;
use uuid::Uuid;

use porter_core::error::AppError;
use porter_core::result::AppResult;
use porter_core::traits::{DuplicatePolicy, TargetAdapter, UploadOutcome};
use porter_core::types::{FixityResult, HashAlgorithm, JobStatus, PhaseRecord, Ticket};
use porter_bagit::Bag;
use porter_fixity::compute_hash;
use porter_jobs::{JobOutcome, JobStore};

use crate::message::{self, FixityTally};
use crate::metadata::{self, ActionEntry, METADATA_FILE_NAME};
use crate::workdir::{Workdir, safe_join};

/// Source half of a transfer.
#[derive(Debug)]
pub struct TransferSource {
    /// Source target.
    pub adapter: Arc<dyn TargetAdapter>,
    /// Credential for the source.
    pub token: String,
    /// Resource to move.
    pub resource_id: String,
}

/// Destination half of a transfer.
#[derive(Debug)]
pub struct TransferDestination {
    /// Destination target.
    pub adapter: Arc<dyn TargetAdapter>,
    /// Credential for the destination.
    pub token: String,
    /// Existing container to upload into, or `None` for a new one.
    pub resource_id: Option<String>,
}

/// One transfer job's inputs.
#[derive(Debug)]
pub struct TransferJob {
    /// Record store the job publishes progress into.
    pub store: Arc<JobStore>,
    /// This ticket's working directory.
    pub workdir: Workdir,
    /// Where the payload comes from.
    pub source: TransferSource,
    /// Where the payload goes.
    pub destination: TransferDestination,
    /// What to do with files that already exist on the destination.
    pub duplicate_policy: DuplicatePolicy,
    /// Ticket of the job record.
    pub ticket: Ticket,
}

/// Which phase record a status write belongs to.
#[derive(Debug, Clone, Copy)]
enum Side {
    Download,
    Upload,
}

/// What the download phase hands to the rest of the pipeline.
struct Downloaded {
    tally: FixityTally,
    /// Hash per payload-relative path, computed as the bytes arrived.
    computed: HashMap<String, String>,
    /// Provenance log held aside from the source payload.
    held_metadata: Option<Vec<u8>>,
    files: u64,
    source_username: Option<String>,
}

/// What reaches the destination and how to verify it.
struct Staged {
    upload_dir: PathBuf,
    /// Expected hash per path as the destination will report them.
    expected: HashMap<String, String>,
    units: u64,
    /// Name of the archive artifact, when packaging produced one.
    zip_name: Option<String>,
}

impl TransferJob {
    /// Run the pipeline to completion.
    pub async fn run(self) -> AppResult<JobOutcome> {
        let downloaded = match self.download_phase().await {
            Ok(downloaded) => downloaded,
            Err(err) => {
                self.fail_phase(Side::Download, &err);
                return Err(err);
            }
        };

        let result = self.upload_half(&downloaded).await;
        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.fail_phase(Side::Upload, &err);
                Err(err)
            }
        }
    }

    /// Packaging, upload, and metadata merge, attributed to the upload
    /// phase record.
    async fn upload_half(&self, downloaded: &Downloaded) -> AppResult<JobOutcome> {
        let staged = self.package_phase(downloaded).await?;
        let (outcome, upload_tally) = self.upload_phase(&staged).await?;
        let metadata_valid = self.metadata_phase(downloaded, &outcome).await?;

        let message =
            message::transfer_message(&downloaded.tally, &upload_tally, metadata_valid);
        let mut result = json!({
            "project_id": outcome.project_id,
            "source_username": downloaded.source_username,
            "destination_username": outcome.destination_username,
            "files_transferred": downloaded.files,
            "failed_fixity": {
                "download": downloaded.tally.failed,
                "upload": upload_tally.failed,
            },
            "metadata_valid": metadata_valid,
        });
        if let Some(zip_name) = &staged.zip_name {
            result["zip_name"] = json!(zip_name);
        }
        self.store
            .update(&self.ticket, |record| record.result = Some(result))?;

        Ok(JobOutcome {
            status_code: 200,
            message,
        })
    }

    async fn download_phase(&self) -> AppResult<Downloaded> {
        let source_name = self.source.adapter.name().to_string();
        self.phase_start(
            Side::Download,
            format!("Downloading from '{source_name}'."),
        )?;

        let payload = self
            .source
            .adapter
            .download(&self.source.token, &self.source.resource_id)
            .await?;

        // The provenance log travels separately: held aside here, merged
        // and re-uploaded after the payload lands.
        let mut held_metadata = None;
        let mut files = Vec::new();
        for resource in payload.resources {
            if metadata::is_metadata_file(&resource.relative_path) {
                held_metadata = Some(resource.bytes.to_vec());
            } else {
                files.push(resource);
            }
        }

        if files.is_empty() {
            return Err(if held_metadata.is_some() {
                AppError::validation(format!(
                    "Resource '{}' contains only the transfer metadata file",
                    self.source.resource_id
                ))
            } else {
                AppError::validation(format!(
                    "Resource '{}' contains no files to transfer",
                    self.source.resource_id
                ))
            });
        }

        let n = files.len() as u64;
        let upload_units = if self.destination.adapter.supports_nested_hierarchy() {
            n
        } else {
            1
        };
        self.store.update(&self.ticket, |record| {
            record.total_units = n + upload_units + 1;
            record.units_completed = 0;
        })?;
        self.phase_update(Side::Download, |phase| phase.total_units = n)?;

        let files_dir = self.workdir.files_dir();
        fs::create_dir_all(&files_dir).await?;

        let mut tally = FixityTally::default();
        let mut computed = HashMap::new();
        for resource in &files {
            let fixity = porter_fixity::check(&resource.bytes, &resource.hashes);
            tally.record(&resource.relative_path, &fixity);
            computed.insert(
                resource.relative_path.clone(),
                compute_hash(HashAlgorithm::Sha256, &resource.bytes),
            );

            let destination = safe_join(&files_dir, &resource.relative_path)?;
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&destination, &resource.bytes).await?;

            self.store
                .update(&self.ticket, |record| record.units_completed += 1)?;
            self.phase_update(Side::Download, |phase| phase.units_completed += 1)?;
        }
        for container in &payload.empty_containers {
            fs::create_dir_all(safe_join(&files_dir, container)?).await?;
        }

        self.phase_update(Side::Download, |phase| {
            phase.status = JobStatus::Finished;
            phase.status_code = Some(200);
            phase.message = message::download_message(&tally);
            phase.failed_fixity = tally.failed.clone();
        })?;

        Ok(Downloaded {
            tally,
            computed,
            held_metadata,
            files: n,
            source_username: payload.source_username,
        })
    }

    /// Stage what will be sent: the payload tree as-is for targets that
    /// hold nested hierarchies, a single zipped bag otherwise. The
    /// downloaded tree's top-level shape is checked first, before any
    /// call reaches the destination.
    async fn package_phase(&self, downloaded: &Downloaded) -> AppResult<Staged> {
        self.check_top_level_shape().await?;

        if self.destination.adapter.supports_nested_hierarchy() {
            return Ok(Staged {
                upload_dir: self.workdir.files_dir(),
                expected: downloaded.computed.clone(),
                units: downloaded.files,
                zip_name: None,
            });
        }

        let destination_name = self.destination.adapter.name().to_string();
        self.store.update(&self.ticket, |record| {
            record.message = format!("Preparing the upload for '{destination_name}'.");
        })?;

        let files_dir = self.workdir.files_dir();
        let bag_dir = self.workdir.bag_dir();
        let outgoing = self.workdir.outgoing_dir();
        fs::create_dir_all(&outgoing).await?;
        let zip_path = outgoing.join("bag.zip");
        let zip_for_task = zip_path.clone();
        tokio::task::spawn_blocking(move || -> AppResult<()> {
            let bag = Bag::pack(&files_dir, &bag_dir)?;
            bag.into_zip(&zip_for_task)
        })
        .await
        .map_err(|e| AppError::internal(format!("Packaging task panicked: {e}")))??;

        let zip_bytes = fs::read(&zip_path).await?;
        let mut expected = HashMap::new();
        expected.insert(
            "bag.zip".to_string(),
            compute_hash(HashAlgorithm::Sha256, &zip_bytes),
        );

        Ok(Staged {
            upload_dir: outgoing,
            expected,
            units: 1,
            zip_name: Some("bag.zip".to_string()),
        })
    }

    /// Reject downloaded trees whose top level the destination cannot
    /// place: more than one top-level directory, or loose top-level
    /// files when no existing destination container was named.
    async fn check_top_level_shape(&self) -> AppResult<()> {
        let files_dir = self.workdir.files_dir();
        let mut directories = 0usize;
        let mut loose_files = 0usize;
        let mut entries = fs::read_dir(&files_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                directories += 1;
            } else {
                loose_files += 1;
            }
        }

        if directories > 1 {
            return Err(AppError::structural(
                "The downloaded payload has more than one top-level directory",
            ));
        }
        if loose_files > 0 && self.destination.resource_id.is_none() {
            return Err(AppError::structural(
                "The downloaded payload has loose top-level files and no destination resource was specified",
            ));
        }
        Ok(())
    }

    async fn upload_phase(&self, staged: &Staged) -> AppResult<(UploadOutcome, FixityTally)> {
        let destination_name = self.destination.adapter.name().to_string();
        self.phase_start(Side::Upload, format!("Uploading to '{destination_name}'."))?;
        self.phase_update(Side::Upload, |phase| phase.total_units = staged.units)?;

        let outcome = self
            .destination
            .adapter
            .upload(
                &self.destination.token,
                self.destination.resource_id.as_deref(),
                &staged.upload_dir,
                HashAlgorithm::Sha256,
                self.duplicate_policy,
            )
            .await?;

        let mut tally = FixityTally::default();
        for (path, expected) in &staged.expected {
            let reported = outcome.file_hashes.get(path).cloned().flatten();
            let result = match reported {
                Some(reported) => {
                    let matched = *expected == reported;
                    FixityResult {
                        hash_algorithm: Some(HashAlgorithm::Sha256),
                        source_hash: Some(expected.clone()),
                        computed_hash: Some(reported),
                        fixity: Some(matched),
                        detail: if matched {
                            "Destination hash and Porter's computed hash matched.".to_string()
                        } else {
                            "Destination hash and Porter's computed hash do not match.".to_string()
                        },
                    }
                }
                None => FixityResult {
                    hash_algorithm: None,
                    source_hash: Some(expected.clone()),
                    computed_hash: None,
                    fixity: None,
                    detail: "The destination reported no hash for this file.".to_string(),
                },
            };
            tally.record(path, &result);
        }

        self.store.update(&self.ticket, |record| {
            record.units_completed += staged.units;
        })?;
        self.phase_update(Side::Upload, |phase| {
            phase.units_completed = staged.units;
            phase.status = JobStatus::Finished;
            phase.status_code = Some(200);
            phase.message = message::upload_message(&tally);
            phase.failed_fixity = tally.failed.clone();
        })?;

        Ok((outcome, tally))
    }

    /// Merge this transfer into the provenance log and upload the merged
    /// document into the destination container.
    async fn metadata_phase(
        &self,
        downloaded: &Downloaded,
        outcome: &UploadOutcome,
    ) -> AppResult<bool> {
        self.store.update(&self.ticket, |record| {
            record.message = "Updating the transfer metadata.".to_string();
        })?;

        let container = outcome
            .project_id
            .clone()
            .or_else(|| self.destination.resource_id.clone());

        let entry = ActionEntry {
            id: Uuid::new_v4(),
            date: Utc::now(),
            source_target: self.source.adapter.name().to_string(),
            source_username: downloaded.source_username.clone(),
            source_resource: self.source.resource_id.clone(),
            destination_target: self.destination.adapter.name().to_string(),
            destination_username: outcome.destination_username.clone(),
            destination_resource: container.clone(),
            files_transferred: downloaded.files,
        };
        let (log, valid) = metadata::merge(downloaded.held_metadata.as_deref(), entry);

        let metadata_dir = self.workdir.metadata_dir();
        fs::create_dir_all(&metadata_dir).await?;
        fs::write(
            metadata_dir.join(METADATA_FILE_NAME),
            serde_json::to_vec_pretty(&log)?,
        )
        .await?;

        // Always overwrite: the merged log supersedes whatever the
        // destination already holds.
        self.destination
            .adapter
            .upload(
                &self.destination.token,
                container.as_deref(),
                &metadata_dir,
                HashAlgorithm::Sha256,
                DuplicatePolicy::Update,
            )
            .await?;

        self.store
            .update(&self.ticket, |record| record.units_completed += 1)?;

        Ok(valid)
    }

    fn phase_start(&self, side: Side, message: String) -> AppResult<()> {
        self.store.update(&self.ticket, |record| {
            record.message = message.clone();
            let phase = PhaseRecord::in_progress(message.clone());
            match side {
                Side::Download => record.download = Some(phase),
                Side::Upload => record.upload = Some(phase),
            }
        })
    }

    fn phase_update<F>(&self, side: Side, mutate: F) -> AppResult<()>
    where
        F: FnOnce(&mut PhaseRecord),
    {
        self.store.update(&self.ticket, |record| {
            let phase = match side {
                Side::Download => record.download.as_mut(),
                Side::Upload => record.upload.as_mut(),
            };
            if let Some(phase) = phase {
                mutate(phase);
            }
        })
    }

    /// Best-effort: mark the active phase failed before the supervisor
    /// finalizes the record. Store errors here are swallowed, the job is
    /// failing anyway.
    fn fail_phase(&self, side: Side, err: &AppError) {
        let _ = self.phase_update(side, |phase| {
            phase.status = JobStatus::Failed;
            phase.status_code = Some(err.status_code());
            phase.message = err.message.clone();
        });
    }
}
