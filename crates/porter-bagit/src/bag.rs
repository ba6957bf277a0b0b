//! Bag construction and access.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use porter_core::error::AppError;
use porter_core::result::AppResult;
use porter_core::types::HashAlgorithm;
use porter_fixity::compute_hash;

use crate::manifest::{ManifestEntry, PayloadOxum};

/// Algorithms every bag manifest carries: one strong, one legacy.
pub const MANIFEST_ALGORITHMS: [HashAlgorithm; 2] = [HashAlgorithm::Sha512, HashAlgorithm::Md5];

const BAGIT_DECLARATION: &str = "BagIt-Version: 0.97\nTag-File-Character-Encoding: UTF-8\n";

/// A bag directory on disk.
#[derive(Debug, Clone)]
pub struct Bag {
    root: PathBuf,
}

impl Bag {
    /// Build a bag at `bag_dir` from the files under `source_dir`.
    ///
    /// Copies the payload into `data/`, writes the checksum manifests for
    /// every algorithm in [`MANIFEST_ALGORITHMS`], and records the
    /// Payload-Oxum in `bag-info.txt`.
    pub fn pack(source_dir: &Path, bag_dir: &Path) -> AppResult<Self> {
        let data_dir = bag_dir.join("data");
        fs::create_dir_all(&data_dir)?;

        let files = walk_files(source_dir)?;
        let mut entries = Vec::with_capacity(files.len());
        let mut total_bytes = 0u64;

        for file in &files {
            let relative = file
                .strip_prefix(source_dir)
                .map_err(|_| AppError::internal("Payload file escaped the source directory"))?;
            let destination = data_dir.join(relative);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(file, &destination)?;

            let bytes = fs::read(&destination)?;
            total_bytes += bytes.len() as u64;

            let relative_path = format!("data/{}", to_slash_path(relative));
            let checksums = MANIFEST_ALGORITHMS
                .iter()
                .map(|&algorithm| (algorithm, compute_hash(algorithm, &bytes)))
                .collect();
            entries.push(ManifestEntry {
                relative_path,
                size: bytes.len() as u64,
                checksums,
            });
        }
        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        fs::write(bag_dir.join("bagit.txt"), BAGIT_DECLARATION)?;

        let oxum = PayloadOxum {
            bytes: total_bytes,
            files: entries.len() as u64,
        };
        let mut info = fs::File::create(bag_dir.join("bag-info.txt"))?;
        writeln!(info, "Bagging-Date: {}", chrono::Utc::now().format("%Y-%m-%d"))?;
        writeln!(info, "Payload-Oxum: {oxum}")?;
        writeln!(info, "Bag-Software-Agent: porter-bagit")?;

        for algorithm in MANIFEST_ALGORITHMS {
            let mut manifest =
                fs::File::create(bag_dir.join(format!("manifest-{algorithm}.txt")))?;
            for entry in &entries {
                let checksum = entry.checksum(algorithm).ok_or_else(|| {
                    AppError::internal(format!("Missing {algorithm} checksum during pack"))
                })?;
                writeln!(manifest, "{checksum}  {}", entry.relative_path)?;
            }
        }

        tracing::debug!(
            bag = %bag_dir.display(),
            files = entries.len(),
            bytes = total_bytes,
            "Packed bag"
        );

        Ok(Self {
            root: bag_dir.to_path_buf(),
        })
    }

    /// Open an existing bag directory, checking the BagIt declaration.
    pub fn open(root: &Path) -> AppResult<Self> {
        if !root.join("bagit.txt").is_file() {
            return Err(AppError::structural(format!(
                "'{}' is not a bag: bagit.txt is missing",
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// The bag's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The payload directory.
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// The Payload-Oxum declared in `bag-info.txt`.
    pub fn declared_oxum(&self) -> AppResult<PayloadOxum> {
        let info = fs::read_to_string(self.root.join("bag-info.txt"))?;
        for line in info.lines() {
            if let Some(value) = line.strip_prefix("Payload-Oxum:") {
                return value.trim().parse();
            }
        }
        Err(AppError::structural(
            "bag-info.txt does not declare a Payload-Oxum",
        ))
    }

    /// Parse all checksum manifests into one entry list.
    ///
    /// Entry sizes are taken from the payload on disk and are zero for
    /// manifest entries whose file is missing.
    pub fn manifest(&self) -> AppResult<Vec<ManifestEntry>> {
        let mut entries: Vec<ManifestEntry> = Vec::new();

        for algorithm in MANIFEST_ALGORITHMS {
            let path = self.root.join(format!("manifest-{algorithm}.txt"));
            if !path.is_file() {
                continue;
            }
            let contents = fs::read_to_string(&path)?;
            for line in contents.lines() {
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                let (checksum, relative_path) =
                    line.split_once(char::is_whitespace).ok_or_else(|| {
                        AppError::structural(format!("Malformed manifest line '{line}'"))
                    })?;
                let relative_path = relative_path.trim().to_string();
                let checksum = checksum.to_string();

                if let Some(entry) = entries.iter_mut().find(|e| e.relative_path == relative_path)
                {
                    entry.checksums.push((algorithm, checksum));
                } else {
                    let size = fs::metadata(self.root.join(&relative_path))
                        .map(|m| m.len())
                        .unwrap_or(0);
                    entries.push(ManifestEntry {
                        relative_path,
                        size,
                        checksums: vec![(algorithm, checksum)],
                    });
                }
            }
        }

        if entries.is_empty() {
            return Err(AppError::structural(format!(
                "'{}' has no checksum manifests",
                self.root.display()
            )));
        }
        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(entries)
    }

    /// Serialize the bag into a single zip container at `zip_path`.
    pub fn into_zip(&self, zip_path: &Path) -> AppResult<()> {
        crate::zipfile::zip_dir(&self.root, zip_path)
    }
}

/// Recursively collect every file under `dir`, sorted for determinism.
pub fn walk_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> AppResult<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Render a relative path with forward slashes regardless of platform.
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_payload(dir: &Path) {
        fs::create_dir_all(dir.join("nested")).expect("mkdir");
        fs::write(dir.join("a.txt"), b"alpha").expect("write");
        fs::write(dir.join("nested/b.txt"), b"bravo").expect("write");
    }

    #[test]
    fn test_pack_writes_declaration_and_manifests() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let source = tmp.path().join("source");
        make_payload(&source);

        let bag = Bag::pack(&source, &tmp.path().join("bag")).expect("pack");
        assert!(bag.root().join("bagit.txt").is_file());
        assert!(bag.root().join("manifest-sha512.txt").is_file());
        assert!(bag.root().join("manifest-md5.txt").is_file());
        assert!(bag.data_dir().join("nested/b.txt").is_file());
    }

    #[test]
    fn test_pack_records_oxum() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let source = tmp.path().join("source");
        make_payload(&source);

        let bag = Bag::pack(&source, &tmp.path().join("bag")).expect("pack");
        let oxum = bag.declared_oxum().expect("oxum");
        assert_eq!(oxum.files, 2);
        assert_eq!(oxum.bytes, 10);
    }

    #[test]
    fn test_manifest_merges_algorithms() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let source = tmp.path().join("source");
        make_payload(&source);

        let bag = Bag::pack(&source, &tmp.path().join("bag")).expect("pack");
        let entries = bag.manifest().expect("manifest");
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert!(entry.checksum(HashAlgorithm::Sha512).is_some());
            assert!(entry.checksum(HashAlgorithm::Md5).is_some());
        }
    }

    #[test]
    fn test_open_rejects_non_bag() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = Bag::open(tmp.path()).expect_err("must fail");
        assert_eq!(err.status_code(), 400);
    }
}
