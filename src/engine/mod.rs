// src/engine/mod.rs

//! Change supervision.
//!
//! The pure restart decision lives in [`gate`]; the async shell that owns a
//! watcher and a command chain is [`instance`].

pub mod gate;
pub mod instance;

pub use gate::{RestartGate, DEFAULT_MIN_DELAY};
pub use instance::Instance;
