// src/exec/chain.rs

//! Ordered, killable sequence of commands.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::errors::{Result, WadoError};
use crate::exec::output::OutputSink;
use crate::exec::runner::CommandRunner;

#[derive(Debug, Default)]
struct ChainState {
    running: bool,
    kill_tx: Option<mpsc::Sender<()>>,
    done: Option<watch::Receiver<bool>>,
}

/// Runs its commands one after another, never two at once.
///
/// A failing command is logged and the chain moves on. Only
/// [`CommandChain::kill`] stops the sequence early; commands after the one
/// that was killed are never started.
#[derive(Debug)]
pub struct CommandChain {
    runners: Arc<[CommandRunner]>,
    state: Arc<Mutex<ChainState>>,
}

impl CommandChain {
    pub fn new(runners: Vec<CommandRunner>) -> Self {
        Self {
            runners: runners.into(),
            state: Arc::new(Mutex::new(ChainState::default())),
        }
    }

    /// Parse every command line; fails on the first malformed one.
    pub fn from_commands<I, S>(cmds: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let runners = cmds
            .into_iter()
            .map(|c| CommandRunner::parse(c.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(runners))
    }

    /// Like [`CommandChain::from_commands`], running every command in `dir`.
    pub fn from_commands_in<I, S>(cmds: I, dir: &Path) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let runners = cmds
            .into_iter()
            .map(|c| CommandRunner::parse(c.as_ref()).map(|r| r.with_current_dir(dir)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(runners))
    }

    pub fn runners(&self) -> &[CommandRunner] {
        &self.runners
    }

    pub fn set_output_sink(&self, sink: OutputSink) {
        for runner in self.runners.iter() {
            runner.set_output_sink(sink.clone());
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    /// Start the chain in the background. Fails if it is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if state.running {
            return Err(WadoError::AlreadyRunning("command chain".to_string()));
        }

        let (kill_tx, kill_rx) = mpsc::channel(1);
        let (done_tx, done_rx) = watch::channel(false);
        state.running = true;
        state.kill_tx = Some(kill_tx);
        state.done = Some(done_rx);
        drop(state);

        debug!(commands = self.runners.len(), "starting command chain");
        tokio::spawn(run_chain(
            Arc::clone(&self.runners),
            Arc::clone(&self.state),
            kill_rx,
            done_tx,
        ));
        Ok(())
    }

    /// Stop the command in flight, skip the rest, and wait until the chain
    /// has unwound. No-op if the chain is not running.
    pub async fn kill(&self) {
        let (kill_tx, done) = {
            let state = lock(&self.state);
            if !state.running {
                return;
            }
            (state.kill_tx.clone(), state.done.clone())
        };
        if let Some(tx) = kill_tx {
            // Full means a kill is already pending.
            let _ = tx.try_send(());
        }
        if let Some(mut done) = done {
            let _ = done.wait_for(|finished| *finished).await;
        }
    }

    /// Wait for the current run to complete. Returns at once if never started.
    pub async fn wait(&self) {
        let done = lock(&self.state).done.clone();
        if let Some(mut done) = done {
            let _ = done.wait_for(|finished| *finished).await;
        }
    }

    pub async fn restart(&self) -> Result<()> {
        self.kill().await;
        self.start()
    }
}

async fn run_chain(
    runners: Arc<[CommandRunner]>,
    state: Arc<Mutex<ChainState>>,
    mut kill_rx: mpsc::Receiver<()>,
    done_tx: watch::Sender<bool>,
) {
    let mut aborted = false;

    for runner in runners.iter() {
        if kill_rx.try_recv().is_ok() {
            aborted = true;
            break;
        }

        if let Err(err) = runner.start() {
            error!(command = %runner.spec(), error = %err, "failed to start command");
            continue;
        }

        tokio::select! {
            Some(()) = kill_rx.recv() => {
                if let Err(err) = runner.kill().await {
                    warn!(command = %runner.spec(), error = %err, "failed to kill command");
                }
                aborted = true;
                break;
            }
            res = runner.wait() => {
                if let Err(err) = res {
                    warn!(command = %runner.spec(), error = %err, "command failed");
                }
            }
        }
    }

    if aborted {
        info!("command chain aborted");
    } else {
        debug!("command chain finished");
    }

    lock(&state).running = false;
    done_tx.send_replace(true);
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}
