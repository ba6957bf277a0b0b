//! Core building blocks shared by every Porter crate.
//!
//! Contains the unified error type, configuration schemas, domain types
//! (tickets, job records, fixity results), and the [`traits::TargetAdapter`]
//! contract that target integrations implement.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;
