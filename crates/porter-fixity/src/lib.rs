//! Fixity checking: compares computed content hashes against
//! source-declared ones.

pub mod checker;
pub mod hasher;

pub use checker::check;
pub use hasher::compute_hash;
