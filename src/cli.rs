// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;
use crate::types::WatcherKind;

/// Command-line arguments for `wado`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "wado",
    version,
    about = "Watch files and restart a chain of commands when they change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML). Defaults to `Wado.toml`.
    ///
    /// Globs and commands are resolved relative to the directory holding it.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Force a watcher strategy for every instance, overriding the config.
    #[arg(long, value_enum, value_name = "KIND")]
    pub watcher: Option<WatcherKind>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WADO_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print instances, but don't start anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// The `--config` path, or [`default_config_path`] when omitted.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
