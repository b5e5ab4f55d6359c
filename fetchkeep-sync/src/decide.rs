//! Reconciliation decision procedure.
//!
//! Precedence:
//! 1. `NoLocalNoRemote` (never synced, nothing staged)
//! 2. `HasLocalNoRemote` (synced before, nothing staged)
//! 3. `Updated` (never synced, staged copy present)
//! 4. `NoRemoteChange` (staged digest equals the recorded digest)
//! 5. `Updated` (remote changed, working copy still has the recorded digest)
//! 6. `LocalChangeRemoteChange`
//!
//! Reads only; nothing on disk is created, moved or removed here. The
//! working copy is hashed only when the remote has changed.

use std::io::ErrorKind;
use std::path::Path;

use fetchkeep_core::{Digest, HashAlgorithm, Outcome};

use crate::error::{io_err, SyncError};
use crate::hasher::{hash_file, hash_path};

/// An [`Outcome`] plus the digest to record for it.
///
/// `new_digest` is present exactly when the outcome is [`Outcome::Updated`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    outcome: Outcome,
    new_digest: Option<Digest>,
}

impl Decision {
    fn updated(digest: Digest) -> Self {
        Self {
            outcome: Outcome::Updated,
            new_digest: Some(digest),
        }
    }

    fn unchanged(outcome: Outcome) -> Self {
        debug_assert_ne!(outcome, Outcome::Updated);
        Self {
            outcome,
            new_digest: None,
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn new_digest(&self) -> Option<&Digest> {
        self.new_digest.as_ref()
    }

    pub fn into_parts(self) -> (Outcome, Option<Digest>) {
        (self.outcome, self.new_digest)
    }
}

/// Classify one entry.
///
/// * `local` — the working copy.
/// * `prior` — digest recorded at the last successful sync, if any.
/// * `staged` — the freshly fetched remote copy, if the fetch succeeded.
pub fn decide(
    local: &Path,
    prior: Option<&Digest>,
    staged: Option<&Path>,
    algorithm: HashAlgorithm,
) -> Result<Decision, SyncError> {
    let staged = match (prior, staged) {
        (None, None) => return Ok(Decision::unchanged(Outcome::NoLocalNoRemote)),
        (Some(_), None) => return Ok(Decision::unchanged(Outcome::HasLocalNoRemote)),
        (_, Some(staged)) => staged,
    };

    let remote = hash_file(staged, algorithm)?;
    let Some(prior) = prior else {
        return Ok(Decision::updated(remote));
    };
    if *prior == remote {
        return Ok(Decision::unchanged(Outcome::NoRemoteChange));
    }

    // A deleted working copy has no digest, so it cannot match `prior`.
    let local_digest = match hash_path(local, algorithm) {
        Ok(digest) => Some(digest),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(io_err(local, e)),
    };
    if local_digest.as_ref() == Some(prior) {
        Ok(Decision::updated(remote))
    } else {
        Ok(Decision::unchanged(Outcome::LocalChangeRemoteChange))
    }
}
