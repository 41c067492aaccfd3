// src/watch/fingerprint.rs

//! Content fingerprints used to decide whether a file really changed.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::time::SystemTime;

use blake3::{Hash, Hasher};

/// Content hash + last-modified timestamp of a single file.
///
/// Two fingerprints describe the same content iff their hashes match; the
/// timestamp only decides whether rehashing is worth it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    hash: Hash,
    modified: SystemTime,
}

/// Result of re-examining a tracked file against its stored fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Timestamp did not advance; nothing was rehashed.
    Unchanged,
    /// Timestamp advanced but the content hash is identical.
    Touched(Fingerprint),
    /// Content hash differs from the stored one.
    Changed(Fingerprint),
    /// The path no longer exists.
    Missing,
}

impl Fingerprint {
    /// Stat and hash the file at `path`.
    pub fn compute(path: &Path) -> io::Result<Self> {
        let modified = fs::metadata(path)?.modified()?;
        let hash = hash_file(path)?;
        Ok(Self { hash, modified })
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// Same content, regardless of timestamps.
    pub fn same_content(&self, other: &Fingerprint) -> bool {
        self.hash == other.hash
    }

    /// Re-stat `path` and rehash only if its timestamp moved past ours.
    pub fn refresh(&self, path: &Path) -> io::Result<Refresh> {
        let modified = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Refresh::Missing),
            Err(e) => return Err(e),
        };

        if modified <= self.modified {
            return Ok(Refresh::Unchanged);
        }

        let hash = match hash_file(path) {
            Ok(h) => h,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Refresh::Missing),
            Err(e) => return Err(e),
        };

        let next = Fingerprint { hash, modified };
        if next.same_content(self) {
            Ok(Refresh::Touched(next))
        } else {
            Ok(Refresh::Changed(next))
        }
    }
}

/// Hash a file's content with blake3.
pub fn hash_file(path: &Path) -> io::Result<Hash> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path)?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn backdate(fp: Fingerprint) -> Fingerprint {
        Fingerprint {
            hash: fp.hash,
            modified: fp.modified - Duration::from_secs(10),
        }
    }

    #[test]
    fn identical_rewrite_is_only_a_touch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.go");
        fs::write(&path, "abc").unwrap();

        let stored = backdate(Fingerprint::compute(&path).unwrap());
        fs::write(&path, "abc").unwrap();

        match stored.refresh(&path).unwrap() {
            Refresh::Touched(next) => assert!(next.same_content(&stored)),
            other => panic!("expected Touched, got {other:?}"),
        }
    }

    #[test]
    fn new_content_is_a_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.go");
        fs::write(&path, "abc").unwrap();

        let stored = backdate(Fingerprint::compute(&path).unwrap());
        fs::write(&path, "abcd").unwrap();

        assert!(matches!(stored.refresh(&path).unwrap(), Refresh::Changed(_)));
    }

    #[test]
    fn timestamp_not_advanced_skips_hashing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.go");
        fs::write(&path, "abc").unwrap();

        let stored = Fingerprint::compute(&path).unwrap();
        assert_eq!(stored.refresh(&path).unwrap(), Refresh::Unchanged);
    }

    #[test]
    fn removed_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.go");
        fs::write(&path, "abc").unwrap();

        let stored = Fingerprint::compute(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(stored.refresh(&path).unwrap(), Refresh::Missing);
    }
}
