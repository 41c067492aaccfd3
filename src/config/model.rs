// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::engine::gate::effective_min_delay;
use crate::types::WatcherKind;
use crate::watch::WatchPatterns;

/// Name used for instances that do not set one.
pub const DEFAULT_INSTANCE_NAME: &str = "Wado";

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [[instance]]
/// name = "server"
/// include = ["src/**/*.go"]
/// exclude = ["src/**/*_test.go"]
/// cmds = ["go build -o bin/app .", "./bin/app"]
/// min_delay = 50
/// watcher = "poll"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub instance: Vec<InstanceConfig>,
}

/// One `[[instance]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    #[serde(default = "default_name")]
    pub name: String,

    /// Globs selecting files to watch.
    #[serde(default)]
    pub include: Vec<String>,

    /// Globs removing files from the watch set; they win over `include`.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Commands run in order on start and on every accepted change.
    #[serde(default)]
    pub cmds: Vec<String>,

    /// Minimum milliseconds between two chain starts; `<= 0` means 50.
    #[serde(default, alias = "minDelay")]
    pub min_delay: i64,

    #[serde(default)]
    pub watcher: WatcherKind,
}

fn default_name() -> String {
    DEFAULT_INSTANCE_NAME.to_string()
}

impl InstanceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            include: Vec::new(),
            exclude: Vec::new(),
            cmds: Vec::new(),
            min_delay: 0,
            watcher: WatcherKind::default(),
        }
    }

    pub fn effective_min_delay(&self) -> Duration {
        effective_min_delay(self.min_delay)
    }

    /// Include/exclude globs resolved against `root`.
    pub fn patterns(&self, root: &Path) -> WatchPatterns {
        WatchPatterns::new(self.include.iter(), self.exclude.iter()).with_base(root)
    }
}

/// Validated configuration.
///
/// Obtained through `ConfigFile::try_from(RawConfigFile)`; relative globs and
/// command working directories resolve against [`ConfigFile::root`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    instances: Vec<InstanceConfig>,
    root: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(instances: Vec<InstanceConfig>, root: PathBuf) -> Self {
        Self { instances, root }
    }

    pub fn instances(&self) -> &[InstanceConfig] {
        &self.instances
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Force every instance onto one watcher strategy.
    pub fn override_watcher(&mut self, kind: WatcherKind) {
        for instance in &mut self.instances {
            instance.watcher = kind;
        }
    }
}
