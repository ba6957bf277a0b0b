//! Per-ticket working directories.
//!
//! Every job owns one directory under the configured data root, named by
//! its ticket. Tickets are hex digests, so the name needs no escaping, and
//! one ticket never has two concurrent jobs, so the directory is owned
//! exclusively by the running worker.

use std::path::{Path, PathBuf};

use tokio::fs;

use porter_core::error::AppError;
use porter_core::result::AppResult;
use porter_core::types::Ticket;

/// Factory for per-ticket working directories.
#[derive(Debug, Clone)]
pub struct Workdirs {
    root: PathBuf,
}

impl Workdirs {
    /// Create a factory rooted at `data_root`.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            root: data_root.into(),
        }
    }

    /// Prepare a fresh working directory for `ticket`, clearing any
    /// leftovers from an earlier terminal job on the same ticket.
    pub async fn prepare(&self, ticket: &Ticket) -> AppResult<Workdir> {
        let path = self.root.join(ticket.as_str());
        if fs::try_exists(&path).await? {
            fs::remove_dir_all(&path).await?;
        }
        fs::create_dir_all(&path).await?;
        tracing::debug!(ticket = %ticket, dir = %path.display(), "Prepared working directory");
        Ok(Workdir { path })
    }

    /// The working directory of an already-created job, without touching
    /// the filesystem. Used when serving a finished job's artifacts.
    pub fn existing(&self, ticket: &Ticket) -> Workdir {
        Workdir {
            path: self.root.join(ticket.as_str()),
        }
    }
}

/// One ticket's working directory and its well-known subpaths.
#[derive(Debug, Clone)]
pub struct Workdir {
    path: PathBuf,
}

impl Workdir {
    /// The directory itself.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Downloaded payload files, laid out as on the source.
    pub fn files_dir(&self) -> PathBuf {
        self.path.join("files")
    }

    /// Bag built from the payload.
    pub fn bag_dir(&self) -> PathBuf {
        self.path.join("bag")
    }

    /// The serialized bag served to the client.
    pub fn zip_path(&self) -> PathBuf {
        self.path.join("bag.zip")
    }

    /// Client-uploaded archive contents.
    pub fn incoming_dir(&self) -> PathBuf {
        self.path.join("incoming")
    }

    /// Staging area for what is sent to a destination target.
    pub fn outgoing_dir(&self) -> PathBuf {
        self.path.join("outgoing")
    }

    /// Staging area for the transfer metadata document.
    pub fn metadata_dir(&self) -> PathBuf {
        self.path.join("metadata")
    }
}

/// Join a target-supplied relative path onto `base`, rejecting absolute
/// paths and parent traversal.
pub fn safe_join(base: &Path, relative: &str) -> AppResult<PathBuf> {
    let relative = relative.trim_start_matches('/');
    if relative.is_empty()
        || relative
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err(AppError::structural(format!(
            "'{relative}' is not a safe relative path"
        )));
    }
    Ok(base.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prepare_clears_previous_contents() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let workdirs = Workdirs::new(tmp.path());
        let ticket = Ticket::for_download("tok");

        let workdir = workdirs.prepare(&ticket).await.expect("prepare");
        fs::write(workdir.path().join("stale.txt"), b"old")
            .await
            .expect("write");

        let workdir = workdirs.prepare(&ticket).await.expect("re-prepare");
        assert!(!workdir.path().join("stale.txt").exists());
    }

    #[test]
    fn test_safe_join_rejects_traversal() {
        let base = Path::new("/tmp/work");
        assert!(safe_join(base, "../outside").is_err());
        assert!(safe_join(base, "a/../../b").is_err());
        assert!(safe_join(base, "").is_err());
        assert_eq!(
            safe_join(base, "project/a.txt").expect("join"),
            base.join("project/a.txt")
        );
    }
}
