//! `fetchkeep track <name> <url>` — add an entry or change its URL.

use anyhow::{Context, Result};
use clap::Args;

use fetchkeep_core::EntryName;

use super::Settings;

/// Arguments for `fetchkeep track`.
#[derive(Args, Debug)]
pub struct TrackArgs {
    /// Base file name in the working directory (e.g. "vimrc", "hosts.txt").
    pub name: String,

    /// URL to fetch the file from.
    pub url: String,
}

impl TrackArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let name = EntryName::parse(&self.name)
            .with_context(|| format!("cannot track '{}'", self.name))?;
        settings.ensure_not_reserved(&name)?;
        let mut manifest = settings.load_manifest()?.unwrap_or_default();
        // Load before the manifest changes so a missing store is seeded
        // from the entries that existed until now.
        let mut store = settings.load_store(&manifest)?;

        let added = manifest.upsert(name.clone(), self.url.as_str());
        store.entry(name.clone()).or_insert(None);

        settings.save_manifest(&manifest)?;
        settings.save_store(&store)?;

        if added {
            println!("tracking '{name}' from {}", self.url);
        } else {
            println!("updated source of '{name}' to {}", self.url);
        }
        Ok(())
    }
}
