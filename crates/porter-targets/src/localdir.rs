//! Reference adapter over a local directory tree.
//!
//! Real targets are remote services; this adapter gives the binary and the
//! test suite a complete in-process target. Resources are identified by
//! their path relative to the adapter root, and per-file hashes are
//! computed on the fly, so the adapter behaves like a source that declares
//! checksums and a destination that reports them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use porter_core::error::AppError;
use porter_core::result::AppResult;
use porter_core::traits::{
    DownloadPayload, DownloadedResource, DuplicatePolicy, ResourceSummary, TargetAdapter,
    UploadOutcome,
};
use porter_core::types::HashAlgorithm;
use porter_fixity::compute_hash;

/// Filesystem-backed target adapter.
#[derive(Debug, Clone)]
pub struct LocalDirAdapter {
    name: String,
    root: PathBuf,
    nested_hierarchy: bool,
}

impl LocalDirAdapter {
    /// Create an adapter named `name` rooted at `root`.
    pub fn new(name: impl Into<String>, root: &Path, nested_hierarchy: bool) -> Self {
        Self {
            name: name.into(),
            root: root.to_path_buf(),
            nested_hierarchy,
        }
    }

    fn check_token(&self, token: &str) -> AppResult<()> {
        if token.trim().is_empty() {
            return Err(AppError::target("Token is invalid", 401));
        }
        Ok(())
    }

    fn resolve(&self, resource_id: &str) -> AppResult<PathBuf> {
        let clean = resource_id.trim_matches('/');
        if clean.split('/').any(|part| part == "..") {
            return Err(AppError::validation(format!(
                "'{resource_id}' is not a valid resource id"
            )));
        }
        Ok(self.root.join(clean))
    }

    /// Collect every file under `path` without following symlinks.
    async fn walk(&self, path: &Path) -> AppResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![path.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let entry_path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(entry_path);
                } else {
                    files.push(entry_path);
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl TargetAdapter for LocalDirAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_nested_hierarchy(&self) -> bool {
        self.nested_hierarchy
    }

    async fn fetch_resources(&self, token: &str) -> AppResult<Vec<ResourceSummary>> {
        self.check_token(token)?;
        let mut summaries = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let kind = if entry.file_type().await?.is_dir() {
                "folder"
            } else {
                "file"
            };
            summaries.push(ResourceSummary {
                id: name.clone(),
                title: name,
                kind: kind.to_string(),
                container: None,
            });
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    async fn fetch_resource(&self, token: &str, resource_id: &str) -> AppResult<ResourceSummary> {
        self.check_token(token)?;
        let path = self.resolve(resource_id)?;
        let metadata = fs::metadata(&path).await.map_err(|_| {
            AppError::target(format!("Resource '{resource_id}' was not found"), 404)
        })?;
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| resource_id.to_string());
        Ok(ResourceSummary {
            id: resource_id.to_string(),
            title,
            kind: if metadata.is_dir() { "folder" } else { "file" }.to_string(),
            container: None,
        })
    }

    async fn download(&self, token: &str, resource_id: &str) -> AppResult<DownloadPayload> {
        self.check_token(token)?;
        let path = self.resolve(resource_id)?;
        if !fs::try_exists(&path).await? {
            return Err(AppError::target(
                format!("Resource '{resource_id}' was not found"),
                404,
            ));
        }

        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| resource_id.to_string());

        let mut resources = Vec::new();
        let mut empty_containers = Vec::new();

        if fs::metadata(&path).await?.is_dir() {
            for file in self.walk(&path).await? {
                let relative = file
                    .strip_prefix(&path)
                    .map_err(|_| AppError::internal("File escaped the resource root"))?;
                let relative = format!(
                    "{title}/{}",
                    relative.to_string_lossy().replace('\\', "/")
                );
                resources.push(read_resource(&file, relative).await?);
            }
            // Report directories that exist on the source but hold no files.
            let mut pending = vec![path.clone()];
            while let Some(dir) = pending.pop() {
                let mut entries = fs::read_dir(&dir).await?;
                let mut any = false;
                while let Some(entry) = entries.next_entry().await? {
                    any = true;
                    if entry.file_type().await?.is_dir() {
                        pending.push(entry.path());
                    }
                }
                if !any && dir != path {
                    let relative = dir
                        .strip_prefix(&path)
                        .map_err(|_| AppError::internal("Directory escaped the resource root"))?;
                    empty_containers
                        .push(format!("{title}/{}", relative.to_string_lossy()));
                }
            }
        } else {
            resources.push(read_resource(&path, title).await?);
        }

        tracing::debug!(
            target_name = %self.name,
            resource_id,
            files = resources.len(),
            "Served download"
        );

        Ok(DownloadPayload {
            resources,
            empty_containers,
            source_username: Some(format!("{}-user", self.name)),
        })
    }

    async fn upload(
        &self,
        token: &str,
        resource_id: Option<&str>,
        data_dir: &Path,
        hash_algorithm: HashAlgorithm,
        duplicate_policy: DuplicatePolicy,
    ) -> AppResult<UploadOutcome> {
        self.check_token(token)?;

        let container = match resource_id {
            Some(id) => {
                let path = self.resolve(id)?;
                if !fs::try_exists(&path).await? {
                    return Err(AppError::target(
                        format!("Resource '{id}' was not found"),
                        404,
                    ));
                }
                path
            }
            None => self.root.join(uuid::Uuid::new_v4().to_string()),
        };
        fs::create_dir_all(&container).await?;

        let mut outcome = UploadOutcome {
            destination_username: Some(format!("{}-user", self.name)),
            project_id: Some(
                container
                    .strip_prefix(&self.root)
                    .unwrap_or(&container)
                    .to_string_lossy()
                    .to_string(),
            ),
            ..UploadOutcome::default()
        };

        for file in self.walk(data_dir).await? {
            let relative = file
                .strip_prefix(data_dir)
                .map_err(|_| AppError::internal("File escaped the upload directory"))?;
            let relative_name = relative.to_string_lossy().replace('\\', "/");
            let destination = container.join(relative);

            let exists = fs::try_exists(&destination).await?;
            if exists {
                match duplicate_policy {
                    DuplicatePolicy::Ignore => {
                        outcome.resources_ignored.push(relative_name.clone());
                        let existing = fs::read(&destination).await?;
                        outcome.file_hashes.insert(
                            relative_name,
                            Some(compute_hash(hash_algorithm, &existing)),
                        );
                        continue;
                    }
                    DuplicatePolicy::Update => {
                        outcome.resources_updated.push(relative_name.clone());
                    }
                }
            }

            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).await?;
            }
            let bytes = fs::read(&file).await?;
            fs::write(&destination, &bytes).await?;
            outcome
                .file_hashes
                .insert(relative_name, Some(compute_hash(hash_algorithm, &bytes)));
        }

        tracing::debug!(
            target_name = %self.name,
            files = outcome.file_hashes.len(),
            ignored = outcome.resources_ignored.len(),
            updated = outcome.resources_updated.len(),
            "Accepted upload"
        );

        Ok(outcome)
    }
}

async fn read_resource(path: &Path, relative_path: String) -> AppResult<DownloadedResource> {
    let bytes = fs::read(path).await?;
    let mut hashes = HashMap::new();
    hashes.insert(
        HashAlgorithm::Sha256.as_str().to_string(),
        Some(compute_hash(HashAlgorithm::Sha256, &bytes)),
    );
    Ok(DownloadedResource {
        relative_path,
        bytes: Bytes::from(bytes),
        hashes,
    })
}
