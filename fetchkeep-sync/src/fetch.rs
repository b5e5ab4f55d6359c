//! Fetching remote resources into the staging directory.
//!
//! A fetch either leaves the complete remote body at the destination path
//! and returns that path, or leaves nothing there and returns `None`.
//! Failures are never fatal to a batch; they surface later as the
//! `*_NO_REMOTE` outcomes.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Source of staged downloads.
pub trait Fetch: Send + Sync {
    /// Download `url` into `dest`.
    ///
    /// Returns `Some(dest)` only when the full body was written.
    fn fetch(&self, dest: &Path, url: &str) -> Option<PathBuf>;
}

/// Settings for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Overall deadline for one request, body included.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("fetchkeep/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Blocking HTTP(S) fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

#[derive(Debug, thiserror::Error)]
enum FetchFailure {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("transport: {0}")]
    Transport(Box<ureq::Transport>),
    #[error("I/O: {0}")]
    Io(#[from] io::Error),
    #[error("persist: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl From<ureq::Error> for FetchFailure {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => Self::Status(code),
            ureq::Error::Transport(t) => Self::Transport(Box::new(t)),
        }
    }
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();
        Self { agent }
    }

    fn try_fetch(&self, dest: &Path, url: &str) -> Result<(), FetchFailure> {
        let response = self.agent.get(url).call()?;
        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(FetchFailure::Status(status));
        }

        // Stream into a uniquely named sibling so a failed transfer never
        // leaves bytes at `dest`; the temp file is removed on drop.
        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        let mut part = tempfile::Builder::new()
            .prefix(".fetchkeep-")
            .suffix(".part")
            .tempfile_in(dir)?;
        io::copy(&mut response.into_reader(), part.as_file_mut())?;
        part.as_file().sync_all()?;
        part.persist(dest)?;
        Ok(())
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(&FetchConfig::default())
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, dest: &Path, url: &str) -> Option<PathBuf> {
        match self.try_fetch(dest, url) {
            Ok(()) => {
                tracing::debug!(url, dest = %dest.display(), "fetched");
                Some(dest.to_path_buf())
            }
            Err(err) => {
                tracing::debug!(url, error = %err, "fetch failed");
                discard_stale(dest);
                None
            }
        }
    }
}

/// Remove a staged file left behind by an earlier run, so an absent fetch
/// never looks like a present one.
fn discard_stale(dest: &Path) {
    match std::fs::remove_file(dest) {
        Ok(()) => tracing::debug!(dest = %dest.display(), "removed stale staged file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(dest = %dest.display(), error = %e, "could not remove stale staged file"),
    }
}
