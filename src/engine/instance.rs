// src/engine/instance.rs

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::InstanceConfig;
use crate::engine::gate::RestartGate;
use crate::errors::Result;
use crate::exec::{CommandChain, OutputSink};
use crate::watch::{callback, Watcher};

/// Connects one watcher to one command chain.
///
/// The chain is started once on construction and restarted on every change
/// that the [`RestartGate`] lets through. The gate lock is held for the
/// whole restart, so concurrent changes never restart twice. Once
/// [`Instance::kill`] has begun, no change starts the chain again.
#[derive(Debug)]
pub struct Instance {
    name: String,
    watcher: Watcher,
    chain: Arc<CommandChain>,
    gate: Arc<Mutex<RestartGate>>,
    stopped: Arc<AtomicBool>,
}

impl Instance {
    /// Build and start an instance writing command output to stdout.
    ///
    /// `root` is the directory relative globs and commands resolve against.
    /// Must be called from within a Tokio runtime.
    pub fn start(config: &InstanceConfig, root: &Path) -> Result<Self> {
        Self::start_with_sink(config, root, OutputSink::stdout())
    }

    pub fn start_with_sink(config: &InstanceConfig, root: &Path, sink: OutputSink) -> Result<Self> {
        let name = config.name.clone();
        let watcher = Watcher::new(config.watcher, &config.patterns(root))?;

        let chain = Arc::new(CommandChain::from_commands_in(&config.cmds, root)?);
        chain.set_output_sink(sink);

        let gate = Arc::new(Mutex::new(RestartGate::new(config.effective_min_delay())));
        let stopped = Arc::new(AtomicBool::new(false));
        // Held across the initial start so an early change cannot race it.
        let mut armed = gate.try_lock().map_err(anyhow::Error::from)?;

        watcher.add_callback(callback({
            let name = name.clone();
            let chain = Arc::clone(&chain);
            let gate = Arc::clone(&gate);
            let stopped = Arc::clone(&stopped);
            move |path| {
                on_change(
                    name.clone(),
                    Arc::clone(&chain),
                    Arc::clone(&gate),
                    Arc::clone(&stopped),
                    path,
                )
            }
        }));

        chain.start()?;
        armed.record_start(Instant::now());
        drop(armed);

        info!(
            instance = %name,
            files = watcher.file_count(),
            commands = config.cmds.len(),
            min_delay_ms = config.effective_min_delay().as_millis() as u64,
            "instance started"
        );

        Ok(Self {
            name,
            watcher,
            chain,
            gate,
            stopped,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }

    pub fn chain(&self) -> &CommandChain {
        &self.chain
    }

    /// Run the change handler directly, as the watcher would.
    pub async fn notify_change(&self, path: impl Into<PathBuf>) {
        on_change(
            self.name.clone(),
            Arc::clone(&self.chain),
            Arc::clone(&self.gate),
            Arc::clone(&self.stopped),
            path.into(),
        )
        .await;
    }

    /// Stop the commands and the watcher together; returns once both are done.
    ///
    /// A restart already in flight is waited out, and nothing it started
    /// survives.
    pub async fn kill(&self) {
        info!(instance = %self.name, "stopping instance");
        self.stopped.store(true, Ordering::SeqCst);
        let ((), closed) = tokio::join!(self.chain.kill(), async { self.watcher.close() });
        if let Err(err) = closed {
            warn!(instance = %self.name, error = %err, "failed to close watcher");
        }

        let _gate = self.gate.lock().await;
        self.chain.kill().await;
        debug!(instance = %self.name, "instance stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

async fn on_change(
    name: String,
    chain: Arc<CommandChain>,
    gate: Arc<Mutex<RestartGate>>,
    stopped: Arc<AtomicBool>,
    path: PathBuf,
) {
    let mut gate = gate.lock().await;
    if stopped.load(Ordering::SeqCst) {
        debug!(instance = %name, ?path, "change ignored; instance is stopping");
        return;
    }
    if !gate.allows(Instant::now()) {
        debug!(instance = %name, ?path, "change absorbed inside min delay");
        return;
    }

    info!(instance = %name, ?path, "change detected; restarting commands");
    chain.kill().await;
    // Shutdown may have begun while the old run was unwinding.
    if stopped.load(Ordering::SeqCst) {
        debug!(instance = %name, "restart abandoned; instance is stopping");
        return;
    }
    if let Err(err) = chain.start() {
        error!(instance = %name, error = %err, "failed to restart command chain");
        return;
    }
    gate.record_start(Instant::now());
}
