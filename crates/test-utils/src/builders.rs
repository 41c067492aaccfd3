#![allow(dead_code)]

use wado::config::{ConfigFile, InstanceConfig, RawConfigFile};
use wado::types::WatcherKind;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_instance(mut self, instance: InstanceConfig) -> Self {
        self.config.instance.push(instance);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `InstanceConfig`.
pub struct InstanceConfigBuilder {
    instance: InstanceConfig,
}

impl InstanceConfigBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            instance: InstanceConfig::new(name),
        }
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.instance.include.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.instance.exclude.push(pattern.to_string());
        self
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.instance.cmds.push(cmd.to_string());
        self
    }

    pub fn min_delay(mut self, ms: i64) -> Self {
        self.instance.min_delay = ms;
        self
    }

    pub fn watcher(mut self, kind: WatcherKind) -> Self {
        self.instance.watcher = kind;
        self
    }

    pub fn build(self) -> InstanceConfig {
        self.instance
    }
}
