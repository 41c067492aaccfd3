// src/config/mod.rs

//! Configuration loading and validation.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_root, default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, InstanceConfig, RawConfigFile, DEFAULT_INSTANCE_NAME};
