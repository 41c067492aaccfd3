// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `include` / `exclude` glob patterns against a base directory.
//! - Deciding which directories could ever hold a match, so walks and
//!   subscriptions skip everything else.
//! - Tracking a content fingerprint per matching file and reporting only
//!   real content changes, either by polling or through native events.
//!
//! It does **not** know about commands; it only turns filesystem activity
//! into changed paths.

pub mod event_watcher;
pub mod fingerprint;
pub mod notifier;
pub mod path_utils;
pub mod patterns;
pub mod poll_watcher;
pub mod store;
pub mod walk;
pub mod watcher;

pub use event_watcher::EventWatcher;
pub use fingerprint::{Fingerprint, Refresh};
pub use notifier::{callback, ChangeCallback, ChangeNotifier, CHANGE_CHANNEL_CAPACITY};
pub use patterns::{lowest_dir_to_watch, CompiledPatterns, DirMatcher, PathFilter, WatchPatterns};
pub use poll_watcher::PollWatcher;
pub use store::FingerprintStore;
pub use watcher::Watcher;
