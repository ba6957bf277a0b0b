//! Manifest entries and the aggregate Payload-Oxum.

use std::fmt;
use std::str::FromStr;

use porter_core::error::AppError;
use porter_core::types::HashAlgorithm;

/// One payload file as recorded in a bag's manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Path relative to the bag root, always under `data/`.
    pub relative_path: String,
    /// File size in bytes.
    pub size: u64,
    /// Checksums keyed by algorithm.
    pub checksums: Vec<(HashAlgorithm, String)>,
}

impl ManifestEntry {
    /// The checksum recorded for `algorithm`, if present.
    pub fn checksum(&self, algorithm: HashAlgorithm) -> Option<&str> {
        self.checksums
            .iter()
            .find(|(a, _)| *a == algorithm)
            .map(|(_, h)| h.as_str())
    }
}

/// Aggregate payload counts: total bytes and total file count.
///
/// Serialized as `"<bytes>.<files>"` in `bag-info.txt`. A mismatch against
/// the recomputed value indicates truncation or injection even when every
/// per-file checksum passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadOxum {
    /// Total payload bytes.
    pub bytes: u64,
    /// Total payload file count.
    pub files: u64,
}

impl fmt::Display for PayloadOxum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.bytes, self.files)
    }
}

impl FromStr for PayloadOxum {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (bytes, files) = s
            .split_once('.')
            .ok_or_else(|| AppError::structural(format!("Malformed Payload-Oxum '{s}'")))?;
        let bytes = bytes
            .parse()
            .map_err(|_| AppError::structural(format!("Malformed Payload-Oxum '{s}'")))?;
        let files = files
            .parse()
            .map_err(|_| AppError::structural(format!("Malformed Payload-Oxum '{s}'")))?;
        Ok(Self { bytes, files })
    }
}
