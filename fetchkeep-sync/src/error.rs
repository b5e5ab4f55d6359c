//! Error types for fetchkeep-sync.

use std::path::PathBuf;

use thiserror::Error;

use fetchkeep_core::CoreError;

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from core types or the manifest.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The digest store could not be parsed.
    #[error("failed to parse digest store at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error (digest store write path).
    #[error("digest store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Entries and prior digests must describe the same set of names.
    #[error("length mismatch: {entries} entries but {digests} recorded digests")]
    EntryCountMismatch { entries: usize, digests: usize },

    #[error("no recorded digest slot for entry '{name}'")]
    MissingDigestEntry { name: String },

    #[error("entry '{name}' appears more than once in the batch")]
    DuplicateEntry { name: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
