//! Side effects for each [`Outcome`].
//!
//! | outcome                   | working copy           | staged file        |
//! |---------------------------|------------------------|--------------------|
//! | `Updated`                 | replaced by rename     | consumed           |
//! | `NoRemoteChange`          | untouched              | removed            |
//! | `LocalChangeRemoteChange` | untouched              | kept for the user  |
//! | `*NoRemote`               | untouched              | (none)             |

use std::path::Path;

use fetchkeep_core::{Digest, HashAlgorithm, Outcome};

use crate::decide::{decide, Decision};
use crate::error::{io_err, SyncError};

/// Decide, then promote or discard the staged file.
///
/// A failed replace is returned as an error and the decision is dropped, so
/// a digest is only ever reported for content that actually landed.
pub fn apply(
    local: &Path,
    prior: Option<&Digest>,
    staged: Option<&Path>,
    algorithm: HashAlgorithm,
) -> Result<Decision, SyncError> {
    let decision = decide(local, prior, staged, algorithm)?;
    match (decision.outcome(), staged) {
        (Outcome::Updated, Some(staged)) => {
            // rename(2) replaces the target atomically on the same filesystem;
            // across filesystems it fails rather than copying.
            std::fs::rename(staged, local).map_err(|e| io_err(local, e))?;
            tracing::debug!(path = %local.display(), "promoted staged copy");
        }
        (Outcome::NoRemoteChange, Some(staged)) => {
            std::fs::remove_file(staged).map_err(|e| io_err(staged, e))?;
        }
        _ => {}
    }
    Ok(decision)
}

/// Decide without touching the working copy.
///
/// Staged files that [`apply`] would have consumed are removed, so the cache
/// directory ends up as a real run would leave it.
pub fn preview(
    local: &Path,
    prior: Option<&Digest>,
    staged: Option<&Path>,
    algorithm: HashAlgorithm,
) -> Result<Decision, SyncError> {
    let decision = decide(local, prior, staged, algorithm)?;
    if let (Outcome::Updated | Outcome::NoRemoteChange, Some(staged)) = (decision.outcome(), staged)
    {
        std::fs::remove_file(staged).map_err(|e| io_err(staged, e))?;
    }
    Ok(decision)
}
