// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WadoError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("watch root {path:?} is not accessible: {source}")]
    WatchRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse command: {0}")]
    CommandParse(String),

    #[error("command {command:?} exited with code {code}")]
    CommandFailed { command: Vec<String>, code: i32 },

    #[error("already running: {0}")]
    AlreadyRunning(String),

    #[error("file watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WadoError>;
