// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] splits command strings into a binary and arguments.
//! - [`output`] is the shared destination for command output.
//! - [`platform`] hides how a process group is interrupted or terminated.
//! - [`runner`] runs and stops a single command.
//! - [`chain`] runs a list of commands in order and can abort it midway.

pub mod chain;
pub mod command;
pub mod output;
pub mod platform;
pub mod runner;

pub use chain::CommandChain;
pub use command::CommandSpec;
pub use output::{OutputSink, SharedBuffer};
pub use platform::{Platform, ProcessControl};
pub use runner::CommandRunner;
