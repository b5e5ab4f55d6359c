pub mod status;
pub mod sync;
pub mod track;
pub mod untrack;

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;

use fetchkeep_core::{EntryName, HashAlgorithm, Manifest};
use fetchkeep_sync::{hash_store, DigestStore, FetchConfig};

/// Options shared by every command.
///
/// File and directory options are resolved relative to `--dir` unless they
/// are absolute.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Working directory holding the tracked files.
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Name → URL manifest.
    #[arg(long, global = true, default_value = ".name_url.json")]
    pub manifest: PathBuf,

    /// Name → last synced digest store.
    #[arg(long, global = true, default_value = ".downloads.json")]
    pub state: PathBuf,

    /// Staging directory for fresh downloads.
    #[arg(long, global = true, default_value = ".cache")]
    pub cache_dir: PathBuf,

    /// Hash algorithm: sha224, sha256, sha384, sha512, sha512_256, blake3.
    #[arg(long, global = true, default_value_t = HashAlgorithm::Sha256)]
    pub algorithm: HashAlgorithm,

    /// Maximum number of concurrent downloads.
    #[arg(long, global = true, default_value = "4")]
    pub jobs: NonZeroUsize,

    /// Per-download timeout in seconds.
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout: u64,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Settings {
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(&self.manifest)
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(&self.state)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dir.join(&self.cache_dir)
    }

    /// Refuse a name whose working copy would land on the manifest, the
    /// digest store or the cache directory.
    pub fn ensure_not_reserved(&self, name: &EntryName) -> Result<()> {
        let target = self.dir.join(name);
        let reserved = [
            ("manifest", self.manifest_path()),
            ("digest store", self.state_path()),
            ("cache directory", self.cache_path()),
        ];
        if let Some((what, path)) = reserved
            .iter()
            .find(|(_, path)| same_location(path, &target))
        {
            bail!(
                "'{name}' collides with the {what} at {}; choose another name",
                path.display()
            );
        }
        Ok(())
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(self.timeout),
            ..FetchConfig::default()
        }
    }

    /// Load the manifest; `None` when there is none.
    pub fn load_manifest(&self) -> Result<Option<Manifest>> {
        let path = self.manifest_path();
        Manifest::load(&path).with_context(|| format!("failed to load {}", path.display()))
    }

    /// Load the digest store, marking every manifest entry never-synced when
    /// the store does not exist yet.
    pub fn load_store(&self, manifest: &Manifest) -> Result<DigestStore> {
        let path = self.state_path();
        hash_store::load_or_unsynced(&path, manifest.entries())
            .with_context(|| format!("failed to load {}", path.display()))
    }

    pub fn save_store(&self, store: &DigestStore) -> Result<()> {
        let path = self.state_path();
        hash_store::save(&path, store).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn save_manifest(&self, manifest: &Manifest) -> Result<()> {
        let path = self.manifest_path();
        manifest
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Lexical match, or same file name under the same canonical parent.
fn same_location(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    let resolve = |p: &Path| -> Option<PathBuf> {
        let parent = p
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        Some(parent.canonicalize().ok()?.join(p.file_name()?))
    };
    matches!((resolve(a), resolve(b)), (Some(a), Some(b)) if a == b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        settings: Settings,
    }

    fn settings(args: &[&str]) -> Settings {
        Harness::parse_from(std::iter::once("fetchkeep").chain(args.iter().copied())).settings
    }

    fn name(s: &str) -> EntryName {
        EntryName::parse(s).unwrap()
    }

    #[test]
    fn own_files_are_reserved() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_str().unwrap();
        let s = settings(&["--dir", dir]);

        for reserved in [".name_url.json", ".downloads.json", ".cache"] {
            let err = s.ensure_not_reserved(&name(reserved)).unwrap_err();
            assert!(err.to_string().contains("collides with"), "{reserved}: {err}");
        }
        s.ensure_not_reserved(&name("vimrc")).unwrap();
    }

    #[test]
    fn reserved_names_follow_overrides() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_str().unwrap();
        let s = settings(&["--dir", dir, "--state", "state.json"]);

        assert!(s.ensure_not_reserved(&name("state.json")).is_err());
        s.ensure_not_reserved(&name(".downloads.json")).unwrap();
    }

    #[test]
    fn absolute_override_is_matched_by_location() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_str().unwrap();
        let manifest = tmp.path().join("urls.json");
        let s = settings(&["--dir", dir, "--manifest", manifest.to_str().unwrap()]);

        let err = s.ensure_not_reserved(&name("urls.json")).unwrap_err();
        assert!(err.to_string().contains("manifest"));
    }
}
