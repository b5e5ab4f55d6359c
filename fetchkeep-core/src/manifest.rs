//! Manifest — the name → URL document listing every tracked entry.
//!
//! On disk the manifest is JSON, either an array of `[name, url]` pairs
//! (order is preserved and drives report order) or a flat `{name: url}`
//! object (ordered by name). Saves always write the pair-array form using
//! an atomic `.tmp` + rename.

use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;

use crate::error::{io_err, CoreError};
use crate::types::{EntryName, TrackedEntry};

/// Ordered set of tracked entries, unique by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<TrackedEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestCompat {
    Pairs(Vec<(String, String)>),
    Map(BTreeMap<String, String>),
}

impl Manifest {
    /// Build a manifest from ordered entries, rejecting duplicate names.
    pub fn from_entries(entries: Vec<TrackedEntry>) -> Result<Self, CoreError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.name.clone()) {
                return Err(CoreError::DuplicateEntry {
                    name: entry.name.to_string(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Load the manifest at `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, CoreError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(path, e)),
        };
        let raw: ManifestCompat =
            serde_json::from_str(&contents).map_err(|source| CoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let pairs: Vec<(String, String)> = match raw {
            ManifestCompat::Pairs(pairs) => pairs,
            ManifestCompat::Map(map) => map.into_iter().collect(),
        };
        let entries = pairs
            .into_iter()
            .map(|(name, url)| Ok(TrackedEntry::new(EntryName::parse(name)?, url)))
            .collect::<Result<Vec<_>, CoreError>>()?;
        Self::from_entries(entries).map(Some)
    }

    /// Save the manifest to `path` atomically.
    ///
    /// Writes to `<path>.tmp` then renames to `<path>`.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let pairs: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e.url.as_str()))
            .collect();
        let json = serde_json::to_string_pretty(&pairs)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(path, e));
        }
        Ok(())
    }

    pub fn entries(&self) -> &[TrackedEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a new entry at the end, or replace the URL of an existing one
    /// in place. Returns `true` when the entry is new.
    pub fn upsert(&mut self, name: EntryName, url: impl Into<String>) -> bool {
        let url = url.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => {
                existing.url = url;
                false
            }
            None => {
                self.entries.push(TrackedEntry::new(name, url));
                true
            }
        }
    }

    pub fn remove(&mut self, name: &EntryName) -> Option<TrackedEntry> {
        let idx = self.entries.iter().position(|e| &e.name == name)?;
        Some(self.entries.remove(idx))
    }
}
