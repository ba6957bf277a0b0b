//! The fixity check itself.
//!
//! Pure function, no state: iterate the declared hashes in the fixed
//! preference order, compute the first usable one, and compare. A mismatch
//! is returned, never raised; callers aggregate results into the job
//! outcome.

use std::collections::HashMap;

use porter_core::types::{FixityResult, HashAlgorithm};

use crate::hasher::compute_hash;

/// Compare `bytes` against the hashes a source declared for them.
///
/// `fixity` in the result is `Some(true)` on match, `Some(false)` on
/// mismatch for the first usable algorithm, and `None` when no declared
/// hash is usable; the detail string distinguishes a missing hash from an
/// unsupported algorithm.
pub fn check(bytes: &[u8], declared: &HashMap<String, Option<String>>) -> FixityResult {
    for algorithm in HashAlgorithm::PREFERENCE {
        let Some(Some(source_hash)) = declared.get(algorithm.as_str()) else {
            continue;
        };

        let computed = compute_hash(algorithm, bytes);
        let matched = computed == *source_hash;
        let detail = if matched {
            "Source hash and Porter's computed hash matched.".to_string()
        } else {
            "Source hash and Porter's computed hash do not match.".to_string()
        };

        return FixityResult {
            hash_algorithm: Some(algorithm),
            source_hash: Some(source_hash.clone()),
            computed_hash: Some(computed),
            fixity: Some(matched),
            detail,
        };
    }

    // No usable hash: distinguish "the source declared nothing" from "it
    // declared only algorithms Porter does not compute".
    let declared_any = declared.values().any(|v| v.is_some());
    let detail = if declared_any {
        "Fixity could not be evaluated: the source declared only unsupported hash algorithms."
            .to_string()
    } else {
        "Fixity could not be evaluated: the source declared no hash.".to_string()
    };

    FixityResult {
        hash_algorithm: None,
        source_hash: None,
        computed_hash: None,
        fixity: None,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(pairs: &[(&str, Option<&str>)]) -> HashMap<String, Option<String>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_match_on_sha256() {
        let hashes = declared(&[(
            "sha256",
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"),
        )]);
        let result = check(b"abc", &hashes);
        assert_eq!(result.fixity, Some(true));
        assert_eq!(result.hash_algorithm, Some(HashAlgorithm::Sha256));
    }

    #[test]
    fn test_mismatch_is_returned_not_raised() {
        let hashes = declared(&[("sha256", Some("deadbeef"))]);
        let result = check(b"abc", &hashes);
        assert_eq!(result.fixity, Some(false));
        assert!(result.is_failure());
    }

    #[test]
    fn test_preference_order_prefers_sha512() {
        let sha512 = crate::hasher::compute_hash(HashAlgorithm::Sha512, b"abc");
        // The md5 value is wrong on purpose; sha512 must win the selection.
        let hashes = declared(&[("md5", Some("deadbeef")), ("sha512", Some(sha512.as_str()))]);
        let result = check(b"abc", &hashes);
        assert_eq!(result.hash_algorithm, Some(HashAlgorithm::Sha512));
        assert_eq!(result.fixity, Some(true));
    }

    #[test]
    fn test_null_hash_is_skipped() {
        let md5 = crate::hasher::compute_hash(HashAlgorithm::Md5, b"abc");
        let hashes = declared(&[("sha512", None), ("md5", Some(md5.as_str()))]);
        let result = check(b"abc", &hashes);
        assert_eq!(result.hash_algorithm, Some(HashAlgorithm::Md5));
        assert_eq!(result.fixity, Some(true));
    }

    #[test]
    fn test_no_declared_hash_is_indeterminate() {
        let result = check(b"abc", &HashMap::new());
        assert_eq!(result.fixity, None);
        assert!(result.is_indeterminate());
        assert!(!result.is_failure());
        assert!(result.detail.contains("declared no hash"));
    }

    #[test]
    fn test_unsupported_algorithm_is_indeterminate_with_detail() {
        let hashes = declared(&[("crc32", Some("abc123"))]);
        let result = check(b"abc", &hashes);
        assert_eq!(result.fixity, None);
        assert!(result.detail.contains("unsupported"));
    }
}
