//! Digest store — the last synced digest of every tracked entry.
//!
//! Persisted as a flat JSON object `{name: digest | null}`; `null` marks an
//! entry that has never been synced. Writes use an atomic `.tmp` + rename.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use fetchkeep_core::{Digest, EntryName, TrackedEntry};

use crate::error::{io_err, SyncError};

/// In-memory digest store keyed by entry name.
pub type DigestStore = BTreeMap<EntryName, Option<Digest>>;

/// Load the digest store at `path`.
///
/// Returns `Ok(None)` when the file does not exist yet.
pub fn load(path: &Path) -> Result<Option<DigestStore>, SyncError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path, e)),
    };
    let store = serde_json::from_str(&contents).map_err(|source| SyncError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(store))
}

/// Load the digest store, or mark every entry never-synced when it is missing.
pub fn load_or_unsynced(path: &Path, entries: &[TrackedEntry]) -> Result<DigestStore, SyncError> {
    Ok(load(path)?.unwrap_or_else(|| never_synced(entries)))
}

/// A store with a `null` digest for every entry.
pub fn never_synced(entries: &[TrackedEntry]) -> DigestStore {
    entries.iter().map(|e| (e.name.clone(), None)).collect()
}

/// Fold a batch's digest updates into `store`.
pub fn merge(store: &mut DigestStore, updates: BTreeMap<EntryName, Digest>) {
    for (name, digest) in updates {
        store.insert(name, Some(digest));
    }
}

/// Save the digest store atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save(path: &Path, store: &DigestStore) -> Result<(), SyncError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let json = serde_json::to_string_pretty(store)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}
