// src/watch/poll_watcher.rs

//! Polling strategy: rescan globs and recheck fingerprints on timers.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::watch::fingerprint::{Fingerprint, Refresh};
use crate::watch::notifier::{ChangeCallback, ChangeNotifier};
use crate::watch::patterns::{CompiledPatterns, WatchPatterns};
use crate::watch::store::FingerprintStore;
use crate::watch::walk::walk_candidates;

/// How often include globs are re-evaluated to find new files.
pub const DISCOVERY_INTERVAL: Duration = Duration::from_millis(1500);
/// How often tracked files are re-stat'ed.
pub const RECHECK_INTERVAL: Duration = Duration::from_millis(300);

/// Watcher that finds changes by polling.
///
/// Two loops run on the Tokio runtime until [`PollWatcher::close`]:
/// - discovery: new files matching the include globs are fingerprinted and
///   reported as changes;
/// - recheck: tracked files whose content hash changed are reported, files
///   that vanished are forgotten without a report.
#[derive(Debug)]
pub struct PollWatcher {
    shared: Arc<PollShared>,
    done_tx: watch::Sender<bool>,
}

#[derive(Debug)]
struct PollShared {
    patterns: CompiledPatterns,
    roots: Vec<PathBuf>,
    store: FingerprintStore,
    notifier: ChangeNotifier,
    closed: AtomicBool,
}

impl PollWatcher {
    /// Must be called from within a Tokio runtime.
    pub fn new(patterns: &WatchPatterns) -> Result<Self> {
        Self::with_intervals(patterns, DISCOVERY_INTERVAL, RECHECK_INTERVAL)
    }

    pub fn with_intervals(
        patterns: &WatchPatterns,
        discovery: Duration,
        recheck: Duration,
    ) -> Result<Self> {
        let compiled = patterns.compile()?;
        let mut roots = compiled.watch_roots()?;
        roots.sort();
        roots.dedup();

        let shared = Arc::new(PollShared {
            patterns: compiled,
            roots,
            store: FingerprintStore::new(),
            notifier: ChangeNotifier::new(),
            closed: AtomicBool::new(false),
        });

        // Files present at startup are the baseline, not changes.
        shared.discover();
        info!(
            files = shared.store.len(),
            roots = ?shared.roots,
            "poll watcher started"
        );

        let (done_tx, done_rx) = watch::channel(false);
        spawn_loop("discovery", Arc::clone(&shared), done_rx.clone(), discovery, |s| {
            s.discover()
        });
        spawn_loop("recheck", Arc::clone(&shared), done_rx, recheck, |s| s.recheck());

        Ok(Self { shared, done_tx })
    }

    pub fn file_count(&self) -> usize {
        self.shared.store.len()
    }

    pub fn tracked_files(&self) -> Vec<PathBuf> {
        self.shared.store.snapshot().into_keys().collect()
    }

    pub fn change_channel(&self) -> mpsc::Receiver<PathBuf> {
        self.shared.notifier.channel()
    }

    pub fn add_callback(&self, callback: ChangeCallback) {
        self.shared.notifier.add_callback(callback);
    }

    /// Stop both loops and forget every tracked file.
    pub fn close(&self) -> Result<()> {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.done_tx.send_replace(true);
        self.shared.store.seal();
        self.shared.notifier.close_channels();
        debug!("poll watcher closed");
        Ok(())
    }
}

impl PollShared {
    /// Fingerprint matching files not tracked yet; returns them.
    fn discover(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for root in &self.roots {
            for entry in walk_candidates(root, &self.patterns) {
                let entry = match entry {
                    Ok(e) => e,
                    Err(err) => {
                        warn!(?root, error = %err, "error while scanning for files");
                        continue;
                    }
                };
                if entry.file_type().is_dir() {
                    continue;
                }
                if self.closed.load(Ordering::SeqCst) {
                    return Vec::new();
                }
                let path = entry.path();
                if !self.patterns.matches_file(path) || self.store.contains(path) {
                    continue;
                }
                match Fingerprint::compute(path) {
                    Ok(fp) => {
                        if self.store.put_if_absent(path, fp) {
                            found.push(path.to_path_buf());
                        }
                    }
                    Err(err) => warn!(?path, error = %err, "could not fingerprint file"),
                }
            }
        }
        found
    }

    /// Recheck every tracked file; returns those whose content changed.
    fn recheck(&self) -> Vec<PathBuf> {
        let mut changed = Vec::new();
        for (path, fp) in self.store.snapshot() {
            if self.closed.load(Ordering::SeqCst) {
                return Vec::new();
            }
            let refreshed = fp.refresh(&path);
            if self.closed.load(Ordering::SeqCst) {
                return Vec::new();
            }
            match refreshed {
                Ok(Refresh::Unchanged) => {}
                Ok(Refresh::Touched(next)) => self.store.put(path, next),
                Ok(Refresh::Changed(next)) => {
                    self.store.put(path.clone(), next);
                    changed.push(path);
                }
                Ok(Refresh::Missing) => {
                    self.store.remove(&path);
                }
                Err(err) => warn!(?path, error = %err, "could not recheck file"),
            }
        }
        changed
    }
}

fn spawn_loop(
    name: &'static str,
    shared: Arc<PollShared>,
    mut done_rx: watch::Receiver<bool>,
    interval: Duration,
    pass: fn(&PollShared) -> Vec<PathBuf>,
) {
    tokio::spawn(async move {
        loop {
            let scan = Arc::clone(&shared);
            match tokio::task::spawn_blocking(move || pass(&scan)).await {
                Ok(paths) => {
                    for path in paths {
                        if *done_rx.borrow() {
                            return;
                        }
                        shared.notifier.publish(&path);
                    }
                }
                Err(err) => warn!(loop_name = name, error = %err, "poll pass failed"),
            }

            tokio::select! {
                res = done_rx.changed() => {
                    if res.is_err() || *done_rx.borrow() {
                        debug!(loop_name = name, "poll loop finished");
                        return;
                    }
                }
                _ = sleep(interval) => {}
            }
        }
    });
}
