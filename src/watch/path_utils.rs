// src/watch/path_utils.rs

//! Utility functions for path handling in the watchers.
//!
//! Every path the watchers track is absolute, lexically cleaned and uses
//! forward slashes, so glob matching and map lookups agree regardless of how
//! a path was discovered (walk, poll, native event).

use std::path::{Component, Path, PathBuf};

/// Convert a path to a string with forward slashes.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make `path` absolute against `base` and clean it lexically.
///
/// `.` components are dropped and `..` pops the previous component. The
/// filesystem is never consulted, so this works for paths that don't exist
/// yet and for strings containing glob metacharacters.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    clean(&joined)
}

/// Lexically clean a path (`a/./b/../c` -> `a/c`).
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Absolute slash string for a glob pattern, resolved against `base`.
pub fn absolute_pattern(pattern: &str, base: &Path) -> String {
    to_slash(&absolutize(Path::new(pattern), base))
}

/// The directory to resolve relative paths against when none is given.
pub fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_handles_dots_and_parents() {
        assert_eq!(clean(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(clean(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(clean(Path::new("./")), PathBuf::from("."));
    }

    #[cfg(unix)]
    #[test]
    fn absolute_pattern_keeps_glob_characters() {
        let base = Path::new("/work/project");
        assert_eq!(
            absolute_pattern("src/**/*.rs", base),
            "/work/project/src/**/*.rs"
        );
        assert_eq!(absolute_pattern("../shared/*.go", base), "/work/shared/*.go");
        assert_eq!(absolute_pattern("/abs/*.txt", base), "/abs/*.txt");
    }
}
