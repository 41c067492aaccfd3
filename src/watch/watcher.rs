// src/watch/watcher.rs

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::info;

use crate::errors::Result;
use crate::types::WatcherKind;
use crate::watch::event_watcher::EventWatcher;
use crate::watch::notifier::ChangeCallback;
use crate::watch::patterns::WatchPatterns;
use crate::watch::poll_watcher::PollWatcher;

/// A running watcher of either strategy.
///
/// Both report the same thing: the absolute path of a tracked file whose
/// content hash changed, or of a newly discovered matching file (poll only).
#[derive(Debug)]
pub enum Watcher {
    Poll(PollWatcher),
    Event(EventWatcher),
}

impl Watcher {
    /// Start a watcher of the given kind.
    ///
    /// Fails if a glob does not compile, if the root directory of an include
    /// glob does not exist, or (event strategy) if a native subscription
    /// cannot be created. Must be called from within a Tokio runtime.
    pub fn new(kind: WatcherKind, patterns: &WatchPatterns) -> Result<Self> {
        info!(?kind, include = ?patterns.include, exclude = ?patterns.exclude, "starting watcher");
        Ok(match kind {
            WatcherKind::Poll => Watcher::Poll(PollWatcher::new(patterns)?),
            WatcherKind::Event => Watcher::Event(EventWatcher::new(patterns)?),
        })
    }

    pub fn kind(&self) -> WatcherKind {
        match self {
            Watcher::Poll(_) => WatcherKind::Poll,
            Watcher::Event(_) => WatcherKind::Event,
        }
    }

    /// Number of files currently tracked.
    pub fn file_count(&self) -> usize {
        match self {
            Watcher::Poll(w) => w.file_count(),
            Watcher::Event(w) => w.file_count(),
        }
    }

    pub fn tracked_files(&self) -> Vec<PathBuf> {
        match self {
            Watcher::Poll(w) => w.tracked_files(),
            Watcher::Event(w) => w.tracked_files(),
        }
    }

    /// A new receiver of changed paths, buffered to
    /// [`CHANGE_CHANNEL_CAPACITY`](crate::watch::notifier::CHANGE_CHANNEL_CAPACITY).
    /// Notifications that do not fit are dropped.
    pub fn change_channel(&self) -> mpsc::Receiver<PathBuf> {
        match self {
            Watcher::Poll(w) => w.change_channel(),
            Watcher::Event(w) => w.change_channel(),
        }
    }

    pub fn add_callback(&self, callback: ChangeCallback) {
        match self {
            Watcher::Poll(w) => w.add_callback(callback),
            Watcher::Event(w) => w.add_callback(callback),
        }
    }

    /// Stop watching. Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        match self {
            Watcher::Poll(w) => w.close(),
            Watcher::Event(w) => w.close(),
        }
    }
}
