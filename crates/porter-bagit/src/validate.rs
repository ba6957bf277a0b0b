//! Bag validation.
//!
//! Recomputes every manifest checksum and the aggregate Payload-Oxum and
//! classifies each deviation. The three issue kinds matter to callers
//! because their retry policies differ: a checksum mismatch is a content
//! integrity failure, while missing or unexpected files usually mean a
//! malformed or mid-extraction archive.

use std::fs;

use serde::{Deserialize, Serialize};

use porter_core::result::AppResult;
use porter_core::types::HashAlgorithm;
use porter_fixity::compute_hash;

use crate::bag::{Bag, to_slash_path, walk_files};
use crate::manifest::PayloadOxum;

/// One validation deviation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// A payload file's content differs from its manifest checksum.
    ChecksumMismatch {
        /// Bag-relative path.
        path: String,
        /// Algorithm that mismatched.
        algorithm: HashAlgorithm,
        /// Checksum recorded in the manifest.
        expected: String,
        /// Checksum recomputed from the payload.
        computed: String,
    },
    /// A manifest entry has no corresponding payload file.
    MissingFile {
        /// Bag-relative path.
        path: String,
    },
    /// A payload file appears in no manifest.
    UnexpectedFile {
        /// Bag-relative path.
        path: String,
    },
}

/// Outcome of validating one bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// All deviations found.
    pub issues: Vec<ValidationIssue>,
    /// Oxum declared in `bag-info.txt`.
    pub declared_oxum: String,
    /// Oxum recomputed from the payload.
    pub computed_oxum: String,
}

impl ValidationReport {
    /// Whether the bag is intact: no issues and a matching oxum.
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty() && self.oxum_matches()
    }

    /// Whether the declared and recomputed oxums agree.
    pub fn oxum_matches(&self) -> bool {
        self.declared_oxum == self.computed_oxum
    }

    /// A short human summary of the first problem, for error messages.
    pub fn summary(&self) -> String {
        if !self.oxum_matches() {
            return format!(
                "Payload-Oxum mismatch: declared {} but payload is {}",
                self.declared_oxum, self.computed_oxum
            );
        }
        match self.issues.first() {
            Some(ValidationIssue::ChecksumMismatch { path, algorithm, .. }) => {
                format!("Checksum mismatch ({algorithm}) for '{path}'")
            }
            Some(ValidationIssue::MissingFile { path }) => {
                format!("Manifest entry '{path}' is missing from the payload")
            }
            Some(ValidationIssue::UnexpectedFile { path }) => {
                format!("Payload file '{path}' appears in no manifest")
            }
            None => "Bag is valid".to_string(),
        }
    }
}

/// Validate the bag rooted at `bag`.
///
/// Structural problems that prevent validation at all (no manifests, no
/// oxum) surface as errors; content deviations are reported in the
/// returned [`ValidationReport`].
pub fn validate(bag: &Bag) -> AppResult<ValidationReport> {
    let entries = bag.manifest()?;
    let declared_oxum = bag.declared_oxum()?;

    let data_dir = bag.data_dir();
    let payload = if data_dir.is_dir() {
        walk_files(&data_dir)?
    } else {
        Vec::new()
    };

    let mut issues = Vec::new();
    let mut payload_paths = Vec::with_capacity(payload.len());
    let mut total_bytes = 0u64;

    for file in &payload {
        let relative = file
            .strip_prefix(bag.root())
            .map(to_slash_path)
            .unwrap_or_else(|_| file.display().to_string());
        total_bytes += fs::metadata(file)?.len();
        payload_paths.push(relative);
    }

    for entry in &entries {
        let on_disk = bag.root().join(&entry.relative_path);
        if !on_disk.is_file() {
            issues.push(ValidationIssue::MissingFile {
                path: entry.relative_path.clone(),
            });
            continue;
        }
        let bytes = fs::read(&on_disk)?;
        for (algorithm, expected) in &entry.checksums {
            let computed = compute_hash(*algorithm, &bytes);
            if computed != *expected {
                issues.push(ValidationIssue::ChecksumMismatch {
                    path: entry.relative_path.clone(),
                    algorithm: *algorithm,
                    expected: expected.clone(),
                    computed,
                });
            }
        }
    }

    for path in &payload_paths {
        if !entries.iter().any(|e| e.relative_path == *path) {
            issues.push(ValidationIssue::UnexpectedFile { path: path.clone() });
        }
    }

    let computed_oxum = PayloadOxum {
        bytes: total_bytes,
        files: payload_paths.len() as u64,
    };

    Ok(ValidationReport {
        issues,
        declared_oxum: declared_oxum.to_string(),
        computed_oxum: computed_oxum.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn packed_bag(tmp: &Path) -> Bag {
        let source = tmp.join("source");
        fs::create_dir_all(&source).expect("mkdir");
        fs::write(source.join("a.txt"), b"alpha").expect("write");
        fs::write(source.join("b.txt"), b"bravo").expect("write");
        Bag::pack(&source, &tmp.join("bag")).expect("pack")
    }

    #[test]
    fn test_untouched_bag_validates_clean() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bag = packed_bag(tmp.path());
        let report = validate(&bag).expect("validate");
        assert!(report.is_valid(), "unexpected issues: {:?}", report.issues);
    }

    #[test]
    fn test_modified_payload_is_checksum_mismatch() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bag = packed_bag(tmp.path());
        fs::write(bag.data_dir().join("a.txt"), b"tampered").expect("write");

        let report = validate(&bag).expect("validate");
        assert!(!report.is_valid());
        assert!(matches!(
            report.issues.first(),
            Some(ValidationIssue::ChecksumMismatch { path, .. }) if path == "data/a.txt"
        ));
    }

    #[test]
    fn test_deleted_payload_is_missing_file_and_oxum_mismatch() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bag = packed_bag(tmp.path());
        fs::remove_file(bag.data_dir().join("b.txt")).expect("remove");

        let report = validate(&bag).expect("validate");
        assert!(!report.oxum_matches());
        assert!(report
            .issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::MissingFile { path } if path == "data/b.txt")));
    }

    #[test]
    fn test_injected_payload_is_unexpected_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bag = packed_bag(tmp.path());
        fs::write(bag.data_dir().join("smuggled.txt"), b"extra").expect("write");

        let report = validate(&bag).expect("validate");
        assert!(!report.oxum_matches());
        assert!(report.issues.iter().any(
            |i| matches!(i, ValidationIssue::UnexpectedFile { path } if path == "data/smuggled.txt")
        ));
    }
}
