//! BagIt-style packaging: a verifiable, content-addressed archive built
//! from a directory tree.
//!
//! A bag is a directory with a `data/` payload, per-file checksum
//! manifests (sha512 + legacy md5), and a `bag-info.txt` carrying the
//! Payload-Oxum (`total_bytes.total_files`) used to detect truncation or
//! injection independently of per-file hashes. [`validate`] recomputes
//! everything and classifies each deviation.

pub mod bag;
pub mod manifest;
pub mod validate;
pub mod zipfile;

pub use bag::Bag;
pub use manifest::{ManifestEntry, PayloadOxum};
pub use validate::{ValidationIssue, ValidationReport, validate};
pub use zipfile::{extract_zip, zip_dir};
