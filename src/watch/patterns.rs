// src/watch/patterns.rs

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::errors::{Result, WadoError};
use crate::watch::path_utils::{absolute_pattern, absolutize, current_dir, to_slash};

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Include/exclude glob lists for one watcher, plus the directory that
/// relative patterns are resolved against.
///
/// ```toml
/// include = ["src/**/*.go"]
/// exclude = ["src/**/*_test.go"]
/// ```
#[derive(Debug, Clone)]
pub struct WatchPatterns {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub base: PathBuf,
}

impl WatchPatterns {
    /// Patterns resolved against the current working directory.
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
            base: current_dir(),
        }
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = base.into();
        self
    }

    /// Compile every pattern. Fails on the first invalid glob.
    pub fn compile(&self) -> Result<CompiledPatterns> {
        let include: Vec<String> = self
            .include
            .iter()
            .map(|p| absolute_pattern(p, &self.base))
            .collect();
        let exclude: Vec<String> = self
            .exclude
            .iter()
            .map(|p| absolute_pattern(p, &self.base))
            .collect();

        let filter = PathFilter::from_absolute(&include, &exclude)?;
        let dirs = include
            .iter()
            .map(|p| DirMatcher::from_absolute(p))
            .collect::<Result<Vec<_>>>()?;

        Ok(CompiledPatterns {
            include,
            filter,
            dirs,
        })
    }
}

/// Compiled form of [`WatchPatterns`], shared by both watcher strategies.
#[derive(Debug, Clone)]
pub struct CompiledPatterns {
    include: Vec<String>,
    filter: PathFilter,
    dirs: Vec<DirMatcher>,
}

impl CompiledPatterns {
    /// Absolute include patterns, in declaration order.
    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// Should `path` be tracked as a file?
    pub fn matches_file(&self, path: &Path) -> bool {
        self.filter.matches(path)
    }

    /// Could any include pattern match something at or below `dir`?
    pub fn could_contain_match(&self, dir: &Path) -> bool {
        self.dirs.iter().any(|m| m.could_contain_match(dir))
    }

    /// The fixed ancestor directory of each include pattern.
    ///
    /// Every root must exist.
    pub fn watch_roots(&self) -> Result<Vec<PathBuf>> {
        self.include.iter().map(|p| watch_root(p)).collect()
    }
}

/// Compiled include/exclude globs over absolute, slash-normalised paths.
///
/// Exclusion is checked first: a path matching any exclude pattern never
/// matches, even if it matches an include pattern.
#[derive(Clone)]
pub struct PathFilter {
    include_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathFilter")
            .field("include", &self.include_set.len())
            .field("exclude", &self.exclude_set.as_ref().map(GlobSet::len))
            .finish()
    }
}

impl PathFilter {
    /// Compile patterns that are already absolute.
    pub fn from_absolute(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set = build_globset(include)?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude)?)
        };
        Ok(Self {
            include_set,
            exclude_set,
        })
    }

    pub fn matches(&self, path: &Path) -> bool {
        let path = to_slash(path);
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(&path) {
                return false;
            }
        }
        self.include_set.is_match(&path)
    }
}

/// Build a GlobSet where `*` and `?` never cross a `/`.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .map_err(|source| WadoError::InvalidGlob {
                pattern: pat.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| WadoError::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}

/// Predicate answering "could a file matching this glob live at or below
/// this directory?".
///
/// It over-approximates: false positives are fine, false negatives are not.
/// Watchers use it only to decide which directories deserve a subscription.
#[derive(Debug, Clone)]
pub struct DirMatcher {
    regex: Regex,
    base: PathBuf,
}

impl DirMatcher {
    /// Compile `pattern`, resolving it against `base` if relative.
    pub fn new(pattern: &str, base: &Path) -> Result<Self> {
        let mut matcher = Self::from_absolute(&absolute_pattern(pattern, base))?;
        matcher.base = base.to_path_buf();
        Ok(matcher)
    }

    /// Compile an already absolute, slash-normalised pattern.
    pub fn from_absolute(pattern: &str) -> Result<Self> {
        let source = dir_regex(pattern);
        let regex = Regex::new(&source).map_err(|e| {
            WadoError::ConfigError(format!(
                "could not build directory matcher for '{pattern}': {e}"
            ))
        })?;
        Ok(Self {
            regex,
            base: current_dir(),
        })
    }

    pub fn could_contain_match(&self, dir: &Path) -> bool {
        let dir = absolutize(dir, &self.base);
        self.regex.is_match(&to_slash(&dir))
    }
}

/// Translate the directory part of a glob into an anchored regex.
///
/// Each `/` opens an optional group closed at the end, so every ancestor of
/// a matching directory matches too. Everything from the first `**` (or a
/// brace group spanning segments) on becomes an unconstrained suffix.
fn dir_regex(pattern: &str) -> String {
    let (fixed, unbounded) = match unbounded_from(pattern) {
        Some(idx) => (&pattern[..idx], true),
        None => (dir_part(pattern), false),
    };

    let mut out = String::from("^");
    let mut closers = String::new();
    if unbounded {
        closers.push_str(".*");
    }

    let chars: Vec<char> = fixed.chars().collect();
    let mut in_brace = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '/' => {
                out.push_str("(?:/");
                closers.push_str(")?");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '{' => {
                in_brace = true;
                out.push_str("(?:");
            }
            ',' if in_brace => out.push('|'),
            '}' if in_brace => {
                in_brace = false;
                out.push(')');
            }
            '[' => match chars[i + 1..].iter().position(|&c| c == ']') {
                Some(len) if len > 0 => {
                    let body: String = chars[i + 1..i + 1 + len].iter().collect();
                    out.push('[');
                    let body = match body.strip_prefix('!') {
                        Some(rest) => {
                            out.push('^');
                            rest.to_string()
                        }
                        None => body,
                    };
                    out.push_str(&body.replace('\\', "\\\\").replace('[', "\\["));
                    out.push(']');
                    i += len + 1;
                }
                _ => out.push_str(&regex::escape("[")),
            },
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
        i += 1;
    }

    if in_brace {
        // Unterminated brace: let the rest match anything.
        out.push_str(".*)");
    }

    out.push_str(&closers);
    out.push('$');
    out
}

/// Index where the pattern stops constraining directory depth: the first
/// `**`, or a brace group containing a `/`.
fn unbounded_from(pattern: &str) -> Option<usize> {
    let double_star = pattern.find("**");
    let spanning_brace = pattern.char_indices().find_map(|(i, c)| {
        if c != '{' {
            return None;
        }
        let rest = &pattern[i..];
        let close = rest.find('}').unwrap_or(rest.len());
        rest[..close].contains('/').then_some(i)
    });
    match (double_star, spanning_brace) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Everything before the last `/` (`"/"` for a root-level pattern, `"."`
/// if there is no separator at all).
fn dir_part(pattern: &str) -> &str {
    match pattern.rfind('/') {
        Some(0) => "/",
        Some(idx) => &pattern[..idx],
        None => ".",
    }
}

/// The lowest wildcard-free ancestor directory of `pattern`; the place a
/// recursive walk has to start to see every file the pattern can match.
pub fn lowest_dir_to_watch(pattern: &str) -> String {
    let pattern = pattern.replace('\\', "/");
    match pattern.find(GLOB_META) {
        Some(idx) => dir_part(&pattern[..idx]).to_string(),
        None => dir_part(&pattern).to_string(),
    }
}

/// [`lowest_dir_to_watch`], required to exist.
pub fn watch_root(pattern: &str) -> Result<PathBuf> {
    let path = PathBuf::from(lowest_dir_to_watch(pattern));
    match fs::metadata(&path) {
        Ok(_) => Ok(path),
        Err(source) => Err(WadoError::WatchRoot { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(pattern: &str) -> DirMatcher {
        DirMatcher::new(pattern, Path::new("/work")).unwrap()
    }

    #[test]
    fn single_star_matches_ancestors_and_exact_depth_only() {
        let m = matcher("a/*/b/*.go");
        assert!(m.could_contain_match(Path::new("a")));
        assert!(m.could_contain_match(Path::new("a/x")));
        assert!(m.could_contain_match(Path::new("a/x/b")));
        assert!(!m.could_contain_match(Path::new("a/x/y")));
        assert!(!m.could_contain_match(Path::new("a/x/b/c")));
        assert!(m.could_contain_match(Path::new("/work")));
    }

    #[test]
    fn multiple_single_stars() {
        let m = matcher("path/*/my/*/asd.go");
        assert!(m.could_contain_match(Path::new("path/to/my/folder")));
        assert!(m.could_contain_match(Path::new("path/alsoto/my/folder")));
        assert!(!m.could_contain_match(Path::new("path/to/another/my/folder")));
        assert!(!m.could_contain_match(Path::new("path/to/my/folder/not")));
    }

    #[test]
    fn double_star_matches_any_depth_below_prefix() {
        let m = matcher("path/to/valid/**/*/sub/file.go");
        assert!(m.could_contain_match(Path::new("path/to/valid/folder")));
        assert!(m.could_contain_match(Path::new(
            "path/to/valid/folder/no/matcher/how/itlooks/sub/with/more"
        )));
        assert!(!m.could_contain_match(Path::new("path/to/invalid/folder")));
    }

    #[test]
    fn trailing_double_star_is_unbounded() {
        let m = matcher("src/**");
        assert!(m.could_contain_match(Path::new("src/a/b/c")));
        assert!(!m.could_contain_match(Path::new("other")));
    }

    #[test]
    fn literal_regex_characters_are_escaped() {
        let m = matcher("a.b (1)/*.go");
        assert!(m.could_contain_match(Path::new("a.b (1)")));
        assert!(!m.could_contain_match(Path::new("axb (1)")));
    }

    #[test]
    fn braces_and_classes_translate() {
        let m = matcher("{src,lib}/[a-c]*/x.go");
        assert!(m.could_contain_match(Path::new("lib/alpha")));
        assert!(m.could_contain_match(Path::new("src/beta")));
        assert!(!m.could_contain_match(Path::new("lib/zeta")));
        assert!(!m.could_contain_match(Path::new("test")));
    }

    #[test]
    fn lowest_dir_stops_at_first_wildcard() {
        assert_eq!(lowest_dir_to_watch("path/to/my/*_files.go"), "path/to/my");
        assert_eq!(lowest_dir_to_watch("path/to/my/**/*_files.go"), "path/to/my");
        assert_eq!(lowest_dir_to_watch("path/to/my/cool_*.go"), "path/to/my");
        assert_eq!(lowest_dir_to_watch("path/to/my/cool_file.go"), "path/to/my");
        assert_eq!(
            lowest_dir_to_watch("path/to/my/**/*/very/deep/*_files.go"),
            "path/to/my"
        );
        assert_eq!(lowest_dir_to_watch("../../**/*/sub/dir/*_files.go"), "../..");
        assert_eq!(lowest_dir_to_watch("."), ".");
        assert_eq!(lowest_dir_to_watch("/*.go"), "/");
    }

    #[test]
    fn missing_watch_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/nope/**/*.go", to_slash(dir.path()));
        assert!(matches!(
            watch_root(&pattern),
            Err(WadoError::WatchRoot { .. })
        ));

        let ok = format!("{}/**/*.go", to_slash(dir.path()));
        assert!(watch_root(&ok).is_ok());
    }

    #[test]
    fn exclude_wins_over_include() {
        let patterns = WatchPatterns::new(["src/**/*.rs"], ["src/tmp/**"]).with_base("/work");
        let compiled = patterns.compile().unwrap();
        assert!(compiled.matches_file(Path::new("/work/src/main.rs")));
        assert!(compiled.matches_file(Path::new("/work/src/a/b.rs")));
        assert!(!compiled.matches_file(Path::new("/work/src/tmp/generated.rs")));
        assert!(!compiled.matches_file(Path::new("/work/src/main.go")));
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let compiled = WatchPatterns::new(["*.go"], Vec::<String>::new())
            .with_base("/work")
            .compile()
            .unwrap();
        assert!(compiled.matches_file(Path::new("/work/a.go")));
        assert!(!compiled.matches_file(Path::new("/work/sub/a.go")));
    }

    #[test]
    fn invalid_glob_is_reported() {
        let err = WatchPatterns::new(["src/[.rs"], Vec::<String>::new())
            .compile()
            .unwrap_err();
        assert!(matches!(err, WadoError::InvalidGlob { .. }));
    }
}
