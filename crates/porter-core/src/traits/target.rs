//! Target adapter contract.
//!
//! A target is an external storage or repository service. Per-target
//! integrations are black boxes to the orchestration core: they expose the
//! four operations below and nothing else. The trait is defined here in
//! `porter-core` and implemented in adapter crates; adapters signal
//! target-side failures as [`AppError::target`] carrying the service's
//! status code (401 invalid token, 404 not found, 403 forbidden, 410 gone,
//! or a passthrough server error).
//!
//! [`AppError::target`]: crate::error::AppError::target

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::HashAlgorithm;

/// Summary of one resource on a target, as listed by `fetch_resources`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSummary {
    /// Target-scoped resource identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// `"file"`, `"folder"`, or `"project"`.
    pub kind: String,
    /// Identifier of the containing resource, if any.
    pub container: Option<String>,
}

/// One downloaded item: its bytes, path, and source-declared hashes.
#[derive(Debug, Clone)]
pub struct DownloadedResource {
    /// Path of the item relative to the downloaded root.
    pub relative_path: String,
    /// File contents.
    pub bytes: Bytes,
    /// Source-declared hashes keyed by algorithm name. A key may map to
    /// `None` when the target knows the algorithm but has no value.
    pub hashes: HashMap<String, Option<String>>,
}

/// Everything a source target returns for one download call.
#[derive(Debug, Clone, Default)]
pub struct DownloadPayload {
    /// The downloaded files.
    pub resources: Vec<DownloadedResource>,
    /// Directories that exist on the source but contain no files.
    pub empty_containers: Vec<String>,
    /// Username on the source, for the provenance action log.
    pub source_username: Option<String>,
}

/// Everything a destination target returns for one upload call.
#[derive(Debug, Clone, Default)]
pub struct UploadOutcome {
    /// Relative paths skipped because of the duplicate policy.
    pub resources_ignored: Vec<String>,
    /// Relative paths overwritten because of the duplicate policy.
    pub resources_updated: Vec<String>,
    /// Destination-reported hash per uploaded relative path, computed with
    /// the algorithm requested by the caller. `None` when the destination
    /// provides no checksum for that item.
    pub file_hashes: HashMap<String, Option<String>>,
    /// Username on the destination, for the provenance action log.
    pub destination_username: Option<String>,
    /// Identifier of the project/container that now holds the upload.
    pub project_id: Option<String>,
}

/// What to do when an uploaded file already exists on the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep the existing destination file.
    Ignore,
    /// Overwrite the destination file with the uploaded one.
    Update,
}

impl FromStr for DuplicatePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(Self::Ignore),
            "update" => Ok(Self::Update),
            other => Err(AppError::validation(format!(
                "'{other}' is not a valid duplicate policy; expected 'ignore' or 'update'"
            ))),
        }
    }
}

/// Trait for target integrations.
///
/// Implementations live outside the orchestration core; the in-tree
/// `localdir` adapter exists for wiring and tests.
#[async_trait]
pub trait TargetAdapter: Send + Sync + std::fmt::Debug + 'static {
    /// The target name used in request paths.
    fn name(&self) -> &str;

    /// Whether the target can host an arbitrarily deep directory tree.
    /// Finite-depth targets receive a single archive instead.
    fn supports_nested_hierarchy(&self) -> bool;

    /// List top-level resources visible to the credential.
    async fn fetch_resources(&self, token: &str) -> AppResult<Vec<ResourceSummary>>;

    /// Fetch one resource's summary.
    async fn fetch_resource(&self, token: &str, resource_id: &str) -> AppResult<ResourceSummary>;

    /// Download a resource and all of its children.
    async fn download(&self, token: &str, resource_id: &str) -> AppResult<DownloadPayload>;

    /// Upload the contents of `data_dir` into `resource_id` (or a new
    /// container when `None`), reporting per-file hashes computed with
    /// `hash_algorithm`.
    async fn upload(
        &self,
        token: &str,
        resource_id: Option<&str>,
        data_dir: &Path,
        hash_algorithm: HashAlgorithm,
        duplicate_policy: DuplicatePolicy,
    ) -> AppResult<UploadOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_policy_parses() {
        assert_eq!(
            "ignore".parse::<DuplicatePolicy>().expect("parse"),
            DuplicatePolicy::Ignore
        );
        assert_eq!(
            "update".parse::<DuplicatePolicy>().expect("parse"),
            DuplicatePolicy::Update
        );
    }

    #[test]
    fn test_duplicate_policy_rejects_unknown() {
        let err = "upsert".parse::<DuplicatePolicy>().expect_err("must fail");
        assert_eq!(err.status_code(), 400);
    }
}
