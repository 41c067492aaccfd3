// src/watch/event_watcher.rs

//! Native-notification strategy: one `notify` subscription per directory
//! that could contain a match, extended as directories appear.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};

use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::watch::fingerprint::{Fingerprint, Refresh};
use crate::watch::notifier::{ChangeCallback, ChangeNotifier};
use crate::watch::patterns::{CompiledPatterns, WatchPatterns};
use crate::watch::store::FingerprintStore;
use crate::watch::walk::walk_candidates;

/// A directory with a live native subscription.
///
/// Dropping it releases the subscription, which ends its event task.
pub struct WatchedDirectory {
    path: PathBuf,
    _subscription: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WatchedDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchedDirectory")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// How a raw notify event is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Created(PathBuf),
    Removed(PathBuf),
    Written(PathBuf),
}

/// Watcher driven by native filesystem events.
#[derive(Debug)]
pub struct EventWatcher {
    shared: Arc<EventShared>,
}

#[derive(Debug)]
struct EventShared {
    patterns: CompiledPatterns,
    store: FingerprintStore,
    dirs: RwLock<HashMap<PathBuf, WatchedDirectory>>,
    notifier: ChangeNotifier,
    closed: AtomicBool,
}

impl EventWatcher {
    /// Walk the root of every include glob once, subscribing to directories
    /// and fingerprinting matching files.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(patterns: &WatchPatterns) -> Result<Self> {
        let compiled = patterns.compile()?;
        let roots = compiled.watch_roots()?;

        let shared = Arc::new(EventShared {
            patterns: compiled,
            store: FingerprintStore::new(),
            dirs: RwLock::new(HashMap::new()),
            notifier: ChangeNotifier::new(),
            closed: AtomicBool::new(false),
        });

        for root in &roots {
            shared.walk_and_watch(root)?;
        }

        info!(
            files = shared.store.len(),
            dirs = shared.dir_count(),
            "event watcher started"
        );

        Ok(Self { shared })
    }

    pub fn file_count(&self) -> usize {
        self.shared.store.len()
    }

    pub fn tracked_files(&self) -> Vec<PathBuf> {
        self.shared.store.snapshot().into_keys().collect()
    }

    /// Number of directories with a live subscription.
    pub fn dir_count(&self) -> usize {
        self.shared.dir_count()
    }

    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        read(&self.shared.dirs).keys().cloned().collect()
    }

    pub fn change_channel(&self) -> mpsc::Receiver<PathBuf> {
        self.shared.notifier.channel()
    }

    pub fn add_callback(&self, callback: ChangeCallback) {
        self.shared.notifier.add_callback(callback);
    }

    /// Release every subscription and forget every tracked file.
    pub fn close(&self) -> Result<()> {
        self.shared.closed.store(true, Ordering::SeqCst);
        let dirs = std::mem::take(&mut *write(&self.shared.dirs));
        for (_, dir) in dirs {
            dir.task.abort();
        }
        self.shared.store.seal();
        self.shared.notifier.close_channels();
        debug!("event watcher closed");
        Ok(())
    }
}

impl EventShared {
    fn dir_count(&self) -> usize {
        read(&self.dirs).len()
    }

    /// Subscribe to `root` and every candidate directory below it; track
    /// matching files found on the way.
    fn walk_and_watch(self: &Arc<Self>, root: &Path) -> Result<()> {
        for entry in walk_candidates(root, &self.patterns) {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    warn!(?root, error = %err, "error while walking directory");
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                self.watch_dir(entry.path())?;
            } else {
                self.track_if_match(entry.path());
            }
        }
        Ok(())
    }

    fn watch_dir(self: &Arc<Self>, dir: &Path) -> Result<()> {
        if self.closed.load(Ordering::SeqCst)
            || !self.patterns.could_contain_match(dir)
            || read(&self.dirs).contains_key(dir)
        {
            return Ok(());
        }

        let (tx, rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut subscription = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // Receiver gone means the directory was forgotten.
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        subscription.watch(dir, RecursiveMode::NonRecursive)?;

        let mut dirs = write(&self.dirs);
        if dirs.contains_key(dir) {
            return Ok(());
        }
        let task = tokio::spawn(dir_events(Arc::downgrade(self), dir.to_path_buf(), rx));
        dirs.insert(
            dir.to_path_buf(),
            WatchedDirectory {
                path: dir.to_path_buf(),
                _subscription: subscription,
                task,
            },
        );
        debug!(?dir, "subscribed to directory");
        Ok(())
    }

    fn track_if_match(&self, path: &Path) {
        if !self.patterns.matches_file(path) {
            return;
        }
        match Fingerprint::compute(path) {
            Ok(fp) => {
                self.store.put_if_absent(path, fp);
            }
            Err(err) => warn!(?path, error = %err, "could not fingerprint file"),
        }
    }

    /// Apply one action; returns the path if it is a reportable change.
    fn apply(self: &Arc<Self>, action: Action) -> Option<PathBuf> {
        match action {
            Action::Created(path) => {
                let meta = match fs::metadata(&path) {
                    Ok(m) => m,
                    Err(err) => {
                        debug!(?path, error = %err, "created path vanished before inspection");
                        return None;
                    }
                };
                if meta.is_dir() {
                    if let Err(err) = self.walk_and_watch(&path) {
                        warn!(?path, error = %err, "could not watch new directory");
                    }
                    None
                } else if self.store.contains(&path) {
                    // Replaced in place (atomic save): compare content.
                    self.rewritten(path)
                } else {
                    self.track_if_match(&path);
                    None
                }
            }
            Action::Removed(path) => {
                let removed_dirs: Vec<WatchedDirectory> = {
                    let mut dirs = write(&self.dirs);
                    let gone: Vec<PathBuf> = dirs
                        .keys()
                        .filter(|d| d.starts_with(&path))
                        .cloned()
                        .collect();
                    gone.iter().filter_map(|d| dirs.remove(d)).collect()
                };
                if removed_dirs.is_empty() {
                    self.store.remove(&path);
                } else {
                    for dir in &removed_dirs {
                        debug!(dir = ?dir.path, "directory removed; dropping subscription");
                    }
                    for tracked in self.store.snapshot().into_keys() {
                        if tracked.starts_with(&path) {
                            self.store.remove(&tracked);
                        }
                    }
                }
                None
            }
            Action::Written(path) => self.rewritten(path),
        }
    }

    /// Recheck an already tracked file. Untracked paths are ignored.
    fn rewritten(&self, path: PathBuf) -> Option<PathBuf> {
        let fp = self.store.get(&path)?;
        match fp.refresh(&path) {
            Ok(Refresh::Changed(next)) => {
                self.store.put(path.clone(), next);
                Some(path)
            }
            Ok(Refresh::Touched(next)) => {
                self.store.put(path, next);
                None
            }
            Ok(Refresh::Missing) => {
                self.store.remove(&path);
                None
            }
            Ok(Refresh::Unchanged) => None,
            Err(err) => {
                warn!(?path, error = %err, "could not recheck file");
                None
            }
        }
    }
}

/// Consume the native events of one directory until its subscription is
/// released or the watcher is gone.
async fn dir_events(
    shared: Weak<EventShared>,
    dir: PathBuf,
    mut rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
) {
    while let Some(res) = rx.recv().await {
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                warn!(?dir, error = %err, "error while watching directory");
                continue;
            }
        };

        let Some(shared) = shared.upgrade() else {
            break;
        };
        let actions = classify(event);
        if actions.is_empty() {
            continue;
        }

        let worker = Arc::clone(&shared);
        let changed = tokio::task::spawn_blocking(move || {
            actions
                .into_iter()
                .filter_map(|a| worker.apply(a))
                .collect::<Vec<_>>()
        })
        .await;

        match changed {
            Ok(paths) => {
                for path in paths {
                    if shared.closed.load(Ordering::SeqCst) {
                        return;
                    }
                    shared.notifier.publish(&path);
                }
            }
            Err(err) => warn!(?dir, error = %err, "event handling failed"),
        }
    }
    debug!(?dir, "directory event loop finished");
}

/// Map a notify event onto create/remove/write actions.
fn classify(event: Event) -> Vec<Action> {
    let mut paths = event.paths.into_iter();
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.map(Action::Created).collect()
        }
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.map(Action::Removed).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut actions = Vec::new();
            if let Some(from) = paths.next() {
                actions.push(Action::Removed(from));
            }
            if let Some(to) = paths.next() {
                actions.push(Action::Created(to));
            }
            actions
        }
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .map(|p| {
                if p.exists() {
                    Action::Created(p)
                } else {
                    Action::Removed(p)
                }
            })
            .collect(),
        EventKind::Modify(_)
        | EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
            paths.map(Action::Written).collect()
        }
        _ => Vec::new(),
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|p| p.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|p| p.into_inner())
}
