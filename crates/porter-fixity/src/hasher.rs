//! Digest computation over in-memory content.

use sha2::{Digest, Sha256, Sha512};

use porter_core::types::HashAlgorithm;

/// Compute the lowercase hex digest of `bytes` with the given algorithm.
pub fn compute_hash(algorithm: HashAlgorithm, bytes: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Sha512 => {
            let mut hasher = Sha512::new();
            hasher.update(bytes);
            format!("{:x}", hasher.finalize())
        }
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            format!("{:x}", hasher.finalize())
        }
        HashAlgorithm::Md5 => format!("{:x}", md5::compute(bytes)),
    }
}
