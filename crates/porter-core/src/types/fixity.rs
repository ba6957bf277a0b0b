//! Fixity result model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hash algorithms Porter can compute, in descending preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-512 (strong, preferred).
    Sha512,
    /// SHA-256.
    Sha256,
    /// MD5 (legacy, kept for targets that expose nothing stronger).
    Md5,
}

impl HashAlgorithm {
    /// All supported algorithms in the fixed preference order used when a
    /// source declares more than one hash.
    pub const PREFERENCE: [HashAlgorithm; 3] = [Self::Sha512, Self::Sha256, Self::Md5];

    /// Canonical lowercase name, matching the keys adapters report.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha512 => "sha512",
            Self::Sha256 => "sha256",
            Self::Md5 => "md5",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha512" => Ok(Self::Sha512),
            "sha256" => Ok(Self::Sha256),
            "md5" => Ok(Self::Md5),
            other => Err(format!("unsupported hash algorithm '{other}'")),
        }
    }
}

/// Outcome of comparing a computed content hash against a source-declared one.
///
/// `fixity: None` means no comparable hash was available and the check was
/// not evaluated. Callers must treat it as a pass when deciding overall job
/// success; only `Some(false)` is a mismatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixityResult {
    /// Algorithm used for the comparison, when one was usable.
    pub hash_algorithm: Option<HashAlgorithm>,
    /// The hash declared by the source.
    pub source_hash: Option<String>,
    /// The hash Porter computed over the received bytes.
    pub computed_hash: Option<String>,
    /// `Some(true)` match, `Some(false)` mismatch, `None` not evaluated.
    pub fixity: Option<bool>,
    /// Human-readable explanation of the outcome.
    pub detail: String,
}

impl FixityResult {
    /// Whether this result counts against overall job success.
    pub fn is_failure(&self) -> bool {
        self.fixity == Some(false)
    }

    /// Whether the check could not be evaluated.
    pub fn is_indeterminate(&self) -> bool {
        self.fixity.is_none()
    }
}
