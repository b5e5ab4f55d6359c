//! # fetchkeep-sync
//!
//! Hash-gated reconciliation of working copies against remote sources.
//!
//! [`decide`] classifies one entry, [`apply`] performs the matching
//! replace-or-discard, and [`maintain_batch`] runs fetch → decide → act
//! over every tracked entry sharing a working and a cache directory.

pub mod apply;
pub mod batch;
pub mod decide;
pub mod error;
pub mod fetch;
pub mod hash_store;
pub mod hasher;

pub use apply::{apply, preview};
pub use batch::{maintain_batch, BatchOptions, BatchReport, EntryReport};
pub use decide::{decide, Decision};
pub use error::SyncError;
pub use fetch::{Fetch, FetchConfig, HttpFetcher};
pub use hash_store::DigestStore;
pub use hasher::hash_file;
