// src/watch/walk.rs

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::watch::patterns::CompiledPatterns;

/// Recursively walk `root`, skipping directories no include pattern could
/// ever match below.
///
/// The root itself is always visited. Walk errors are yielded to the caller,
/// which logs and skips them.
pub fn walk_candidates<'a>(
    root: &Path,
    patterns: &'a CompiledPatterns,
) -> impl Iterator<Item = walkdir::Result<DirEntry>> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || patterns.could_contain_match(entry.path())
        })
}
