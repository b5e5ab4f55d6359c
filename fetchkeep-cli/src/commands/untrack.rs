//! `fetchkeep untrack <name>` — forget an entry.

use anyhow::{bail, Context, Result};
use clap::Args;

use fetchkeep_core::EntryName;

use super::Settings;

/// Arguments for `fetchkeep untrack`.
#[derive(Args, Debug)]
pub struct UntrackArgs {
    /// Name of the tracked file.
    pub name: String,
}

impl UntrackArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let name = EntryName::parse(&self.name)
            .with_context(|| format!("cannot untrack '{}'", self.name))?;
        let Some(mut manifest) = settings.load_manifest()? else {
            bail!("'{name}' is not tracked");
        };
        let mut store = settings.load_store(&manifest)?;

        if manifest.remove(&name).is_none() {
            bail!("'{name}' is not tracked");
        }
        store.remove(&name);

        settings.save_manifest(&manifest)?;
        settings.save_store(&store)?;
        println!("stopped tracking '{name}'; files on disk were left in place");
        Ok(())
    }
}
