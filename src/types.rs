// src/types.rs

use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;

/// Which change-detection strategy an instance uses.
///
/// - `Poll`: periodically rescan globs and recheck fingerprints (default).
/// - `Event`: subscribe to native filesystem notifications per directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WatcherKind {
    #[default]
    Poll,
    Event,
}

impl FromStr for WatcherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "poll" => Ok(WatcherKind::Poll),
            "event" => Ok(WatcherKind::Event),
            other => Err(format!(
                "invalid watcher: {other} (expected \"poll\" or \"event\")"
            )),
        }
    }
}
