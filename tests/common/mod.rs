#![allow(dead_code)]

pub use wado_test_utils::{
    builders, init_tracing, process, wait_for_change, wait_for_output, wait_for_stabilize,
    with_timeout,
};

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;

/// Append `bytes` to `path` in a single write and flush it to disk.
///
/// Sleeps briefly first so the modification time moves past the one
/// recorded when the file was last fingerprinted.
pub fn append(path: &Path, bytes: &[u8]) {
    std::thread::sleep(Duration::from_millis(50));
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

/// Create `rel` under `root` with `contents`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Next change within `limit`, if any.
pub async fn recv_within(rx: &mut mpsc::Receiver<PathBuf>, limit: Duration) -> Option<PathBuf> {
    tokio::time::timeout(limit, rx.recv()).await.ok().flatten()
}

/// Discard everything already queued on `rx`.
pub fn drain(rx: &mut mpsc::Receiver<PathBuf>) {
    while rx.try_recv().is_ok() {}
}

/// Poll `cond` every 10ms until it holds or `limit` elapses.
pub async fn eventually<F: Fn() -> bool>(limit: Duration, cond: F) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
