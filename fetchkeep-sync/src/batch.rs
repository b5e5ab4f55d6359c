//! Batch coordinator: fetch → decide → act over every tracked entry.
//!
//! Fetches run as a stream of blocking tasks, at most `jobs` in flight. Each
//! entry's decide-and-act step runs after every fetch has finished, in input
//! order.
//! Entries never share a path: `<basedir>/<name>` and `<cachedir>/<name>`
//! are partitioned by name.

use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use fetchkeep_core::{Digest, EntryName, HashAlgorithm, Outcome, TrackedEntry};

use crate::apply::{apply, preview};
use crate::error::{io_err, SyncError};
use crate::fetch::Fetch;
use crate::hash_store::DigestStore;

/// Run-wide settings for [`maintain_batch`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub algorithm: HashAlgorithm,
    /// Upper bound on concurrent fetches.
    pub jobs: NonZeroUsize,
    /// Decide only; never replace a working copy.
    pub dry_run: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            jobs: NonZeroUsize::new(4).unwrap_or(NonZeroUsize::MIN),
            dry_run: false,
        }
    }
}

/// Result for one entry, at the entry's position in the batch.
#[derive(Debug)]
pub struct EntryReport {
    pub name: EntryName,
    /// The outcome, or the filesystem error that stopped this entry.
    pub result: Result<Outcome, SyncError>,
}

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One report per input entry, in input order.
    pub entries: Vec<EntryReport>,
    /// New digests, present exactly for the entries that were updated.
    pub digest_updates: BTreeMap<EntryName, Digest>,
}

impl BatchReport {
    /// Outcomes aligned to the input entries; `None` where the entry failed.
    pub fn outcomes(&self) -> Vec<Option<Outcome>> {
        self.entries.iter().map(|e| e.result.as_ref().ok().copied()).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&EntryName, &SyncError)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().err().map(|err| (&e.name, err)))
    }

}

/// Reconcile every entry in `entries`.
///
/// `prior` must hold exactly one slot per entry name (a `None` slot means
/// never synced); otherwise nothing is fetched, `cachedir` is not created
/// and a precondition error is returned. Errors while acting on one entry are reported in that entry's
/// slot and do not stop the others.
pub fn maintain_batch(
    basedir: &Path,
    cachedir: &Path,
    entries: &[TrackedEntry],
    prior: &DigestStore,
    fetcher: Arc<dyn Fetch>,
    options: &BatchOptions,
) -> Result<BatchReport, SyncError> {
    check_alignment(entries, prior)?;

    std::fs::create_dir_all(cachedir).map_err(|e| io_err(cachedir, e))?;
    let staged = fetch_all(cachedir, entries, &fetcher, options.jobs)?;

    let mut report = BatchReport {
        entries: Vec::with_capacity(entries.len()),
        digest_updates: BTreeMap::new(),
    };
    for (entry, staged) in entries.iter().zip(staged) {
        let local = basedir.join(&entry.name);
        let prior_digest = prior.get(&entry.name).and_then(Option::as_ref);
        let decision = if options.dry_run {
            preview(&local, prior_digest, staged.as_deref(), options.algorithm)
        } else {
            apply(&local, prior_digest, staged.as_deref(), options.algorithm)
        };

        let result = decision.map(|decision| {
            let (outcome, digest) = decision.into_parts();
            if let Some(digest) = digest {
                report.digest_updates.insert(entry.name.clone(), digest);
            }
            outcome
        });
        match &result {
            Ok(outcome) => tracing::debug!(entry = %entry.name, %outcome, "reconciled"),
            Err(err) => tracing::debug!(entry = %entry.name, error = %err, "reconcile failed"),
        }
        report.entries.push(EntryReport {
            name: entry.name.clone(),
            result,
        });
    }

    debug_assert_eq!(report.entries.len(), entries.len());
    Ok(report)
}

fn check_alignment(entries: &[TrackedEntry], prior: &DigestStore) -> Result<(), SyncError> {
    if entries.len() != prior.len() {
        return Err(SyncError::EntryCountMismatch {
            entries: entries.len(),
            digests: prior.len(),
        });
    }
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(&entry.name) {
            return Err(SyncError::DuplicateEntry {
                name: entry.name.to_string(),
            });
        }
        if !prior.contains_key(&entry.name) {
            return Err(SyncError::MissingDigestEntry {
                name: entry.name.to_string(),
            });
        }
    }
    Ok(())
}

/// Fetch every entry into `cachedir`, at most `jobs` at a time.
///
/// Each download is a blocking task on a private runtime; completions arrive
/// in any order and are slotted back by index, so the returned vector is
/// aligned with `entries`.
fn fetch_all(
    cachedir: &Path,
    entries: &[TrackedEntry],
    fetcher: &Arc<dyn Fetch>,
    jobs: NonZeroUsize,
) -> Result<Vec<Option<PathBuf>>, SyncError> {
    let mut staged = vec![None; entries.len()];
    if entries.is_empty() {
        return Ok(staged);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .max_blocking_threads(jobs.get())
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;

    let fetched: Vec<(usize, Option<PathBuf>)> = runtime.block_on(
        stream::iter(entries.iter().enumerate())
            .map(|(idx, entry)| {
                let fetcher = Arc::clone(fetcher);
                let dest = cachedir.join(&entry.name);
                let url = entry.url.clone();
                async move {
                    match tokio::task::spawn_blocking(move || fetcher.fetch(&dest, &url)).await {
                        Ok(path) => (idx, path),
                        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                        Err(e) => {
                            tracing::debug!(index = idx, error = %e, "fetch task cancelled");
                            (idx, None)
                        }
                    }
                }
            })
            .buffer_unordered(jobs.get())
            .collect(),
    );

    for (idx, path) in fetched {
        staged[idx] = path;
    }
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::hash_file;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serves fixed bodies by URL; unknown URLs fail.
    #[derive(Default)]
    struct FakeRemote {
        bodies: Mutex<HashMap<String, String>>,
        calls: AtomicUsize,
    }

    impl FakeRemote {
        fn serve(&self, url: &str, body: &str) {
            self.bodies
                .lock()
                .unwrap()
                .insert(url.to_owned(), body.to_owned());
        }

        fn take_down(&self, url: &str) {
            self.bodies.lock().unwrap().remove(url);
        }
    }

    impl Fetch for FakeRemote {
        fn fetch(&self, dest: &Path, url: &str) -> Option<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = self.bodies.lock().unwrap().get(url).cloned()?;
            fs::write(dest, body).ok()?;
            Some(dest.to_path_buf())
        }
    }

    struct Workspace {
        _root: TempDir,
        base: PathBuf,
        cache: PathBuf,
    }

    fn workspace() -> Workspace {
        let root = TempDir::new().unwrap();
        let base = root.path().to_path_buf();
        let cache = base.join(".cache");
        Workspace {
            _root: root,
            base,
            cache,
        }
    }

    fn entry(name: &str) -> TrackedEntry {
        TrackedEntry::new(
            EntryName::parse(name).unwrap(),
            format!("https://example.com/{name}"),
        )
    }

    fn opts(jobs: usize) -> BatchOptions {
        BatchOptions {
            jobs: NonZeroUsize::new(jobs).unwrap(),
            ..BatchOptions::default()
        }
    }

    /// One entry per outcome (two for `Updated`), keyed by name.
    const SCENARIOS: [(&str, Outcome); 6] = [
        ("conflict.txt", Outcome::LocalChangeRemoteChange),
        ("gone.txt", Outcome::HasLocalNoRemote),
        ("fresh.txt", Outcome::Updated),
        ("never.txt", Outcome::NoLocalNoRemote),
        ("same.txt", Outcome::NoRemoteChange),
        ("clean.txt", Outcome::Updated),
    ];

    /// Lay out local files and remote bodies for every entry in
    /// [`SCENARIOS`] and return the matching prior digests.
    fn stage_scenarios(ws: &Workspace, remote: &FakeRemote) -> DigestStore {
        let synced = |name: &str, body: &str| {
            let path = ws.base.join(name);
            fs::write(&path, body).unwrap();
            hash_file(&path, HashAlgorithm::Sha256).unwrap()
        };
        let url = |name: &str| entry(name).url;

        // conflict: synced v1, edited locally, remote moved to v2
        let conflict_prior = synced("conflict.txt", "v1");
        fs::write(ws.base.join("conflict.txt"), "v1 + edits").unwrap();
        remote.serve(&url("conflict.txt"), "v2");
        // gone: synced before, remote now unreachable
        let gone_prior = synced("gone.txt", "old");
        // fresh: never synced, remote available
        remote.serve(&url("fresh.txt"), "fresh body");
        // same: synced, remote unchanged
        let same_prior = synced("same.txt", "stable");
        remote.serve(&url("same.txt"), "stable");
        // clean: synced, untouched locally, remote moved on
        let clean_prior = synced("clean.txt", "c1");
        remote.serve(&url("clean.txt"), "c2");

        [
            ("conflict.txt", Some(conflict_prior)),
            ("gone.txt", Some(gone_prior)),
            ("fresh.txt", None),
            ("never.txt", None),
            ("same.txt", Some(same_prior)),
            ("clean.txt", Some(clean_prior)),
        ]
        .into_iter()
        .map(|(n, d)| (EntryName::parse(n).unwrap(), d))
        .collect()
    }

    #[test]
    fn count_mismatch_fails_before_any_fetch() {
        let ws = workspace();
        let remote = Arc::new(FakeRemote::default());
        let entries = vec![entry("a.txt"), entry("b.txt")];
        let mut prior = DigestStore::new();
        prior.insert(entries[0].name.clone(), None);

        let err = maintain_batch(&ws.base, &ws.cache, &entries, &prior, remote.clone(), &opts(2))
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::EntryCountMismatch {
                entries: 2,
                digests: 1
            }
        ));
        assert!(err.to_string().contains('2') && err.to_string().contains('1'));
        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
        assert!(!ws.cache.exists(), "cache dir must not be created");
    }

    #[test]
    fn unknown_name_in_prior_fails_before_any_fetch() {
        let ws = workspace();
        let remote = Arc::new(FakeRemote::default());
        let entries = vec![entry("a.txt")];
        let mut prior = DigestStore::new();
        prior.insert(EntryName::parse("other.txt").unwrap(), None);

        let err = maintain_batch(&ws.base, &ws.cache, &entries, &prior, remote.clone(), &opts(1))
            .unwrap_err();

        assert!(matches!(err, SyncError::MissingDigestEntry { ref name } if name == "a.txt"));
        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
        assert!(!ws.cache.exists());
    }

    #[test]
    fn mixed_results_act_on_the_right_files() {
        let ws = workspace();
        let remote = Arc::new(FakeRemote::default());
        let prior = stage_scenarios(&ws, &remote);
        let entries: Vec<_> = SCENARIOS.iter().map(|(n, _)| entry(n)).collect();

        let report =
            maintain_batch(&ws.base, &ws.cache, &entries, &prior, remote.clone(), &opts(3))
                .unwrap();

        assert_eq!(
            report.outcomes(),
            SCENARIOS.iter().map(|(_, o)| Some(*o)).collect::<Vec<_>>()
        );
        let updated: Vec<_> = report.digest_updates.keys().map(|n| n.as_str()).collect();
        assert_eq!(updated, ["clean.txt", "fresh.txt"]);
        assert_eq!(fs::read_to_string(ws.base.join("fresh.txt")).unwrap(), "fresh body");
        assert_eq!(fs::read_to_string(ws.base.join("clean.txt")).unwrap(), "c2");
        assert_eq!(
            fs::read_to_string(ws.base.join("conflict.txt")).unwrap(),
            "v1 + edits"
        );

        // Only the conflicting download is left in the cache.
        let mut cached: Vec<_> = fs::read_dir(&ws.cache)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        cached.sort();
        assert_eq!(cached, ["conflict.txt"]);
    }

    #[rstest]
    fn outcomes_follow_entry_order_for_any_arrangement(
        #[values(
            [0, 1, 2, 3, 4, 5],
            [3, 4, 5, 0, 1, 2],
            [5, 4, 3, 2, 1, 0],
            [1, 3, 5, 0, 2, 4],
            [4, 0, 5, 2, 3, 1]
        )]
        order: [usize; 6],
        #[values(1, 6, 16)] jobs: usize,
    ) {
        let ws = workspace();
        let remote = Arc::new(FakeRemote::default());
        let prior = stage_scenarios(&ws, &remote);
        let entries: Vec<_> = order.iter().map(|&i| entry(SCENARIOS[i].0)).collect();

        let report =
            maintain_batch(&ws.base, &ws.cache, &entries, &prior, remote.clone(), &opts(jobs))
                .unwrap();

        let names: Vec<_> = report.entries.iter().map(|e| e.name.as_str()).collect();
        let expected_names: Vec<_> = order.iter().map(|&i| SCENARIOS[i].0).collect();
        assert_eq!(names, expected_names);
        assert_eq!(
            report.outcomes(),
            order
                .iter()
                .map(|&i| Some(SCENARIOS[i].1))
                .collect::<Vec<_>>()
        );
        assert_eq!(remote.calls.load(Ordering::SeqCst), SCENARIOS.len());
    }

    #[test]
    fn second_run_without_changes_reports_no_remote_change() {
        let ws = workspace();
        let remote = Arc::new(FakeRemote::default());
        let entries = vec![entry("a.txt"), entry("b.txt"), entry("c.txt")];
        for e in &entries {
            remote.serve(&e.url, &format!("body of {}", e.name));
        }
        let mut prior: DigestStore = entries.iter().map(|e| (e.name.clone(), None)).collect();

        let first =
            maintain_batch(&ws.base, &ws.cache, &entries, &prior, remote.clone(), &opts(2))
                .unwrap();
        assert!(first.outcomes().iter().all(|o| *o == Some(Outcome::Updated)));
        crate::hash_store::merge(&mut prior, first.digest_updates);

        let second =
            maintain_batch(&ws.base, &ws.cache, &entries, &prior, remote.clone(), &opts(2))
                .unwrap();
        assert!(second
            .outcomes()
            .iter()
            .all(|o| *o == Some(Outcome::NoRemoteChange)));
        assert!(second.digest_updates.is_empty());
    }

    #[test]
    fn one_failed_fetch_does_not_block_the_rest() {
        let ws = workspace();
        let remote = Arc::new(FakeRemote::default());
        let entries = vec![entry("up.txt"), entry("down.txt")];
        remote.serve(&entries[0].url, "up");
        remote.serve(&entries[1].url, "down");
        remote.take_down(&entries[1].url);
        let prior: DigestStore = entries.iter().map(|e| (e.name.clone(), None)).collect();

        let report =
            maintain_batch(&ws.base, &ws.cache, &entries, &prior, remote.clone(), &opts(1))
                .unwrap();

        assert_eq!(
            report.outcomes(),
            vec![Some(Outcome::Updated), Some(Outcome::NoLocalNoRemote)]
        );
        assert_eq!(remote.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dry_run_reports_without_replacing() {
        let ws = workspace();
        let remote = Arc::new(FakeRemote::default());
        let entries = vec![entry("a.txt")];
        remote.serve(&entries[0].url, "remote");
        let prior: DigestStore = entries.iter().map(|e| (e.name.clone(), None)).collect();
        let options = BatchOptions {
            dry_run: true,
            ..opts(1)
        };

        let report =
            maintain_batch(&ws.base, &ws.cache, &entries, &prior, remote.clone(), &options)
                .unwrap();

        assert_eq!(report.outcomes(), vec![Some(Outcome::Updated)]);
        assert_eq!(report.digest_updates.len(), 1);
        assert!(!ws.base.join("a.txt").exists());
        assert!(!ws.cache.join("a.txt").exists());
    }

    #[test]
    fn entry_error_is_isolated_and_other_digests_survive() {
        let ws = workspace();
        let remote = Arc::new(FakeRemote::default());
        let entries = vec![entry("ok.txt"), entry("blocked.txt")];
        remote.serve(&entries[0].url, "ok");
        remote.serve(&entries[1].url, "v2");
        // A directory in place of the working copy cannot be hashed, so the
        // remote-changed branch fails for this entry only.
        fs::create_dir(ws.base.join("blocked.txt")).unwrap();
        let mut prior: DigestStore = entries.iter().map(|e| (e.name.clone(), None)).collect();
        prior.insert(entries[1].name.clone(), Some(Digest::from_hex("00")));

        let report =
            maintain_batch(&ws.base, &ws.cache, &entries, &prior, remote.clone(), &opts(2))
                .unwrap();

        assert_eq!(report.outcomes(), vec![Some(Outcome::Updated), None]);
        let failed: Vec<_> = report.failures().map(|(name, _)| name.as_str()).collect();
        assert_eq!(failed, ["blocked.txt"]);
        assert_eq!(
            report.digest_updates.keys().map(|n| n.as_str()).collect::<Vec<_>>(),
            ["ok.txt"]
        );
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let ws = workspace();
        let remote = Arc::new(FakeRemote::default());
        let report = maintain_batch(
            &ws.base,
            &ws.cache,
            &[],
            &DigestStore::new(),
            remote.clone(),
            &opts(4),
        )
        .unwrap();
        assert!(report.entries.is_empty());
        assert!(report.digest_updates.is_empty());
        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
    }
}
