// src/config/validate.rs

use crate::config::model::{ConfigFile, InstanceConfig, RawConfigFile};
use crate::errors::{Result, WadoError};
use crate::exec::CommandSpec;
use crate::watch::path_utils::current_dir;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = WadoError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.instance, current_dir()))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_instances(cfg)?;
    for (idx, instance) in cfg.instance.iter().enumerate() {
        validate_instance(idx, instance)?;
    }
    Ok(())
}

fn ensure_has_instances(cfg: &RawConfigFile) -> Result<()> {
    if cfg.instance.is_empty() {
        return Err(WadoError::ConfigError(
            "config must contain at least one [[instance]] table".to_string(),
        ));
    }
    Ok(())
}

fn validate_instance(idx: usize, instance: &InstanceConfig) -> Result<()> {
    let label = format!("instance #{} ('{}')", idx + 1, instance.name);

    if instance.include.is_empty() {
        return Err(WadoError::ConfigError(format!(
            "{label} must list at least one include glob"
        )));
    }

    // Globs only; roots are checked when the watcher starts.
    instance.patterns(&current_dir()).compile()?;

    for cmd in &instance.cmds {
        CommandSpec::parse(cmd).map_err(|err| {
            WadoError::ConfigError(format!("{label} has an invalid command: {err}"))
        })?;
    }

    Ok(())
}
