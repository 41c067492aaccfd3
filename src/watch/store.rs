// src/watch/store.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::watch::fingerprint::Fingerprint;

/// Concurrent map from absolute file path to its last known fingerprint.
///
/// Shared between the tasks of a watcher: reads may run concurrently,
/// writes are exclusive. Once sealed, the store stays empty.
#[derive(Debug, Default)]
pub struct FingerprintStore {
    entries: RwLock<HashMap<PathBuf, Fingerprint>>,
    /// Only flipped while the write lock is held.
    sealed: AtomicBool,
}

impl FingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Fingerprint> {
        self.read().get(path).copied()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.read().contains_key(path)
    }

    pub fn put(&self, path: impl Into<PathBuf>, fingerprint: Fingerprint) {
        let mut entries = self.write();
        if self.is_sealed() {
            return;
        }
        entries.insert(path.into(), fingerprint);
    }

    /// Insert only if `path` is not tracked yet. Returns true if inserted.
    pub fn put_if_absent(&self, path: &Path, fingerprint: Fingerprint) -> bool {
        let mut entries = self.write();
        if self.is_sealed() || entries.contains_key(path) {
            return false;
        }
        entries.insert(path.to_path_buf(), fingerprint);
        true
    }

    pub fn remove(&self, path: &Path) -> Option<Fingerprint> {
        let removed = self.write().remove(path);
        if removed.is_some() {
            debug!(?path, "forgot fingerprint");
        }
        removed
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Forget every entry and ignore all later inserts.
    pub fn seal(&self) {
        let mut entries = self.write();
        self.sealed.store(true, Ordering::SeqCst);
        entries.clear();
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> HashMap<PathBuf, Fingerprint> {
        self.read().clone()
    }

    // Every mutation is a single map call, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<PathBuf, Fingerprint>> {
        self.entries.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<PathBuf, Fingerprint>> {
        self.entries.write().unwrap_or_else(|p| p.into_inner())
    }
}
