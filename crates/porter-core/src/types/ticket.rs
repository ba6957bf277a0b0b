//! Ticket derivation.
//!
//! A ticket is an opaque key identifying one asynchronous job's persisted
//! record. Tickets are derived deterministically from the requesting
//! credentials so a given caller has at most one in-flight job per action
//! type: downloads and uploads hash the single target token, transfers hash
//! the source and destination tokens together.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Opaque identifier for one asynchronous job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(String);

impl Ticket {
    /// Ticket for a download job requested with `token`.
    pub fn for_download(token: &str) -> Self {
        Self(sha256_hex(&format!("download:{token}")))
    }

    /// Ticket for an upload job requested with `token`.
    pub fn for_upload(token: &str) -> Self {
        Self(sha256_hex(&format!("upload:{token}")))
    }

    /// Ticket for a transfer job requested with the pair of credentials.
    pub fn for_transfer(source_token: &str, destination_token: &str) -> Self {
        Self(sha256_hex(&format!(
            "transfer:{source_token}:{destination_token}"
        )))
    }

    /// Reconstruct a ticket from its string form (e.g. a URL path segment).
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The ticket's string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Digest of a target token, persisted at job creation and compared on
/// every poll. The comparison is always against this persisted value,
/// never a re-derivation.
pub fn token_digest(token: &str) -> String {
    sha256_hex(token)
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}
