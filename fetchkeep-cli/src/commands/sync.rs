//! `fetchkeep sync` — fetch, reconcile and record every tracked file.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;

use fetchkeep_core::{EntryName, Outcome, Severity};
use fetchkeep_sync::{
    hash_store, maintain_batch, BatchOptions, BatchReport, HttpFetcher, SyncError,
};

use super::Settings;

/// Arguments for `fetchkeep sync`.
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Report what would happen without replacing any working copy or
    /// recording digests. Downloads are still staged; those a real run would
    /// consume are removed again, conflicting ones stay in the cache.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the per-entry report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct SyncReportJson<'a> {
    dry_run: bool,
    entries: Vec<EntryJson<'a>>,
}

#[derive(Serialize)]
struct EntryJson<'a> {
    name: &'a str,
    outcome: Option<Outcome>,
    digest: Option<&'a str>,
    error: Option<String>,
}

impl SyncArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let Some(manifest) = settings.load_manifest()? else {
            tracing::debug!(
                manifest = %settings.manifest_path().display(),
                "no manifest; nothing to do"
            );
            return Ok(());
        };
        for entry in manifest.entries() {
            settings.ensure_not_reserved(&entry.name)?;
        }
        let mut store = settings.load_store(&manifest)?;

        let cache = settings.cache_path();
        let fetcher = Arc::new(HttpFetcher::new(&settings.fetch_config()));
        let options = BatchOptions {
            algorithm: settings.algorithm,
            jobs: settings.jobs,
            dry_run: self.dry_run,
        };
        let report = maintain_batch(
            &settings.dir,
            &cache,
            manifest.entries(),
            &store,
            fetcher,
            &options,
        )
        .map_err(|err| match err {
            SyncError::EntryCountMismatch { .. }
            | SyncError::MissingDigestEntry { .. }
            | SyncError::DuplicateEntry { .. } => anyhow::Error::new(err).context(format!(
                "{} and {} are out of step; run `fetchkeep track` or fix them by hand",
                settings.manifest_path().display(),
                settings.state_path().display()
            )),
            err => anyhow::Error::new(err).context("failed to reconcile tracked files"),
        })?;

        log_report(&report, &cache, self.dry_run);
        if self.json {
            print_json(&report, self.dry_run)?;
        }

        let total = report.entries.len();
        let failed = report.failures().count();

        if !self.dry_run {
            hash_store::merge(&mut store, report.digest_updates);
            settings.save_store(&store)?;
        }

        if failed > 0 {
            bail!("{failed} of {total} entries failed");
        }
        Ok(())
    }
}

fn log_report(report: &BatchReport, cache: &Path, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    for entry in &report.entries {
        match &entry.result {
            Ok(outcome) => {
                let line = describe(&entry.name, *outcome, cache);
                match outcome.severity() {
                    Severity::Info => tracing::info!("{prefix}{line}"),
                    Severity::Warning => tracing::warn!("{prefix}{line}"),
                }
            }
            Err(err) => tracing::error!("{prefix}{}: {err}", entry.name),
        }
    }
}

/// One-line, human readable description of an entry's outcome.
pub(crate) fn describe(name: &EntryName, outcome: Outcome, cache: &Path) -> String {
    match outcome {
        Outcome::Updated => format!("{name}: updated"),
        Outcome::NoRemoteChange => format!("{name}: no update"),
        Outcome::LocalChangeRemoteChange => format!(
            "{name}: update available under {} but local copy has already been modified",
            cache.display()
        ),
        Outcome::NoLocalNoRemote => format!("{name}: not available"),
        Outcome::HasLocalNoRemote => format!(
            "{name}: not remotely available but found local copy; \
             is the network reachable or has the URL changed?"
        ),
    }
}

fn print_json(report: &BatchReport, dry_run: bool) -> Result<()> {
    let payload = SyncReportJson {
        dry_run,
        entries: report
            .entries
            .iter()
            .map(|e| EntryJson {
                name: e.name.as_str(),
                outcome: e.result.as_ref().ok().copied(),
                digest: report.digest_updates.get(&e.name).map(|d| d.as_str()),
                error: e.result.as_ref().err().map(ToString::to_string),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to render sync report JSON")?
    );
    Ok(())
}
