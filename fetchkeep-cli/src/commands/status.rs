//! `fetchkeep status` — local view of every tracked file, without fetching.

use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use fetchkeep_core::{Digest, HashAlgorithm, Manifest};
use fetchkeep_sync::{hash_file, DigestStore, SyncError};

use super::Settings;

/// Arguments for `fetchkeep status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

/// State of a working copy relative to its last sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum LocalState {
    /// No digest recorded yet.
    NeverSynced,
    /// Synced before, but the working copy is gone.
    Missing,
    /// Working copy differs from the last synced content.
    Modified,
    /// Working copy still matches the last synced content.
    Clean,
}

impl LocalState {
    fn label(self) -> &'static str {
        match self {
            Self::NeverSynced => "never synced",
            Self::Missing => "missing",
            Self::Modified => "modified",
            Self::Clean => "clean",
        }
    }
}

#[derive(Debug, Serialize)]
struct EntryStatus {
    name: String,
    url: String,
    state: LocalState,
    digest: Option<String>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "file")]
    name: String,
    #[tabled(rename = "status")]
    state: String,
    #[tabled(rename = "source")]
    url: String,
}

impl StatusArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let Some(manifest) = settings.load_manifest()? else {
            println!("Nothing tracked. Run `fetchkeep track <name> <url>` first.");
            return Ok(());
        };
        if manifest.is_empty() && !self.json {
            println!("Nothing tracked.");
            return Ok(());
        }
        let store = settings.load_store(&manifest)?;

        let statuses = build_statuses(&settings.dir, &manifest, &store, settings.algorithm)?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&statuses)
                    .context("failed to render status JSON")?
            );
            return Ok(());
        }

        print_table(&statuses);
        Ok(())
    }
}

fn build_statuses(
    basedir: &Path,
    manifest: &Manifest,
    store: &DigestStore,
    algorithm: HashAlgorithm,
) -> Result<Vec<EntryStatus>> {
    manifest
        .entries()
        .iter()
        .map(|entry| {
            let recorded = store.get(&entry.name).and_then(Option::as_ref);
            let state = local_state(&basedir.join(&entry.name), recorded, algorithm)
                .with_context(|| format!("failed to inspect '{}'", entry.name))?;
            Ok(EntryStatus {
                name: entry.name.to_string(),
                url: entry.url.clone(),
                state,
                digest: recorded.map(|d| d.to_string()),
            })
        })
        .collect()
}

fn local_state(
    local: &Path,
    recorded: Option<&Digest>,
    algorithm: HashAlgorithm,
) -> Result<LocalState, SyncError> {
    let Some(recorded) = recorded else {
        return Ok(LocalState::NeverSynced);
    };
    match hash_file(local, algorithm) {
        Ok(current) if &current == recorded => Ok(LocalState::Clean),
        Ok(_) => Ok(LocalState::Modified),
        Err(SyncError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            Ok(LocalState::Missing)
        }
        Err(err) => Err(err),
    }
}

fn print_table(statuses: &[EntryStatus]) {
    let rows: Vec<StatusTableRow> = statuses
        .iter()
        .map(|s| StatusTableRow {
            name: s.name.clone(),
            state: colorize(s.state),
            url: s.url.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let modified = statuses
        .iter()
        .filter(|s| s.state == LocalState::Modified)
        .count();
    if modified > 0 {
        println!(
            "{modified} file(s) edited locally; `fetchkeep sync` will not overwrite them"
        );
    }
}

fn colorize(state: LocalState) -> String {
    let label = state.label();
    match state {
        LocalState::Clean => label.green().to_string(),
        LocalState::Modified => label.yellow().to_string(),
        LocalState::Missing => label.red().to_string(),
        LocalState::NeverSynced => label.dimmed().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetchkeep_core::EntryName;
    use std::fs;
    use tempfile::TempDir;

    const ALGO: HashAlgorithm = HashAlgorithm::Sha256;

    #[test]
    fn classifies_each_local_state() {
        let tmp = TempDir::new().unwrap();
        let clean = tmp.path().join("clean.txt");
        let edited = tmp.path().join("edited.txt");
        fs::write(&clean, "v1").unwrap();
        fs::write(&edited, "v1").unwrap();
        let recorded = hash_file(&clean, ALGO).unwrap();
        fs::write(&edited, "v1 + notes").unwrap();

        assert_eq!(
            local_state(&clean, Some(&recorded), ALGO).unwrap(),
            LocalState::Clean
        );
        assert_eq!(
            local_state(&edited, Some(&recorded), ALGO).unwrap(),
            LocalState::Modified
        );
        assert_eq!(
            local_state(&tmp.path().join("gone.txt"), Some(&recorded), ALGO).unwrap(),
            LocalState::Missing
        );
        assert_eq!(
            local_state(&clean, None, ALGO).unwrap(),
            LocalState::NeverSynced
        );
    }

    #[test]
    fn statuses_follow_manifest_order() {
        let tmp = TempDir::new().unwrap();
        let mut manifest = Manifest::default();
        manifest.upsert(EntryName::parse("b.txt").unwrap(), "https://example.com/b");
        manifest.upsert(EntryName::parse("a.txt").unwrap(), "https://example.com/a");
        let store = fetchkeep_sync::hash_store::never_synced(manifest.entries());

        let statuses = build_statuses(tmp.path(), &manifest, &store, ALGO).unwrap();
        let names: Vec<_> = statuses.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["b.txt", "a.txt"]);
        assert!(statuses
            .iter()
            .all(|s| s.state == LocalState::NeverSynced));
    }
}
