//! fetchkeep core library — domain types, manifest persistence, errors.
//!
//! - [`types`] — entry names, digests, hash algorithms, outcomes
//! - [`error`] — [`CoreError`]
//! - [`manifest`] — the name → URL document

pub mod error;
pub mod manifest;
pub mod types;

pub use error::CoreError;
pub use manifest::Manifest;
pub use types::{Digest, EntryName, HashAlgorithm, Outcome, Severity, TrackedEntry};
