//! Error types for fetchkeep-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::HashAlgorithm;

/// All errors that can arise from core types and manifest persistence.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entry names are bare file names; anything that could escape the
    /// working or cache directory is rejected.
    #[error("invalid entry name '{name}': {reason}")]
    InvalidEntryName { name: String, reason: &'static str },

    #[error(
        "unknown hash algorithm '{0}'; expected one of: {}",
        HashAlgorithm::SUPPORTED.join(", ")
    )]
    UnknownAlgorithm(String),

    /// The same name appears twice in a manifest.
    #[error("duplicate entry '{name}' in manifest")]
    DuplicateEntry { name: String },

    /// I/O failure reading or writing the manifest.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest JSON could not be parsed.
    #[error("failed to parse manifest at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error (write path).
    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
