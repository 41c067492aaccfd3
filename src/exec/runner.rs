// src/exec/runner.rs

//! Single command process runner.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{Result, WadoError};
use crate::exec::command::CommandSpec;
use crate::exec::output::OutputSink;
use crate::exec::platform::{Platform, ProcessControl};

/// How long an interrupted process gets before it is force-terminated.
pub const KILL_GRACE: Duration = Duration::from_secs(2);
/// Interval at which `kill` checks that the process is really gone.
pub const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long output is drained after exit before the copiers are detached.
///
/// A background descendant may inherit the pipes and hold them open long
/// after the process itself is gone.
pub const OUTPUT_DRAIN: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExitOutcome {
    Success,
    Failed(i32),
    WaitError(String),
}

#[derive(Debug, Default)]
struct RunState {
    /// Pid of the live process; cleared by the reaper on exit.
    pid: Option<u32>,
    /// Exit outcome of the most recent run.
    last: Option<watch::Receiver<Option<ExitOutcome>>>,
}

/// Runs one command at a time in its own process group.
///
/// Both output streams are copied into the configured [`OutputSink`]. A
/// background task reaps the process and clears its handle on exit.
#[derive(Debug)]
pub struct CommandRunner {
    spec: CommandSpec,
    current_dir: Option<PathBuf>,
    sink: Mutex<OutputSink>,
    state: Arc<Mutex<RunState>>,
}

impl CommandRunner {
    pub fn new(spec: CommandSpec) -> Self {
        Self {
            spec,
            current_dir: None,
            sink: Mutex::new(OutputSink::default()),
            state: Arc::new(Mutex::new(RunState::default())),
        }
    }

    /// Parse `line` with shell-word rules and build a runner for it.
    pub fn parse(line: &str) -> Result<Self> {
        Ok(Self::new(CommandSpec::parse(line)?))
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Takes effect on the next start.
    pub fn set_output_sink(&self, sink: OutputSink) {
        *lock(&self.sink) = sink;
    }

    pub fn command(&self) -> Vec<String> {
        self.spec.argv()
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Pid of the running process, if any.
    pub fn pid(&self) -> Option<u32> {
        lock(&self.state).pid
    }

    pub fn is_running(&self) -> bool {
        self.pid().is_some()
    }

    /// Spawn the process. Fails if this runner already has a live process.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if state.pid.is_some() {
            return Err(WadoError::AlreadyRunning(self.spec.to_string()));
        }

        let mut cmd = Command::new(self.spec.binary());
        cmd.args(self.spec.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        Platform::configure(&mut cmd);

        let mut child = cmd.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| io::Error::other("spawned process has no pid"))?;

        let sink = lock(&self.sink).clone();
        let mut copiers: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            copiers.push(tokio::spawn(pipe_output(stdout, sink.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            copiers.push(tokio::spawn(pipe_output(stderr, sink)));
        }

        let (done_tx, done_rx) = watch::channel(None);
        state.pid = Some(pid);
        state.last = Some(done_rx);
        drop(state);

        info!(command = %self.spec, pid, "started command");

        let shared = Arc::clone(&self.state);
        let command = self.spec.to_string();
        tokio::spawn(async move {
            let status = child.wait().await;
            {
                let mut state = lock(&shared);
                if state.pid == Some(pid) {
                    state.pid = None;
                }
            }
            drain_output(copiers, &command).await;

            let outcome = match status {
                Ok(s) if s.success() => ExitOutcome::Success,
                Ok(s) => ExitOutcome::Failed(s.code().unwrap_or(-1)),
                Err(err) => ExitOutcome::WaitError(err.to_string()),
            };
            debug!(command = %command, pid, ?outcome, "command exited");
            done_tx.send_replace(Some(outcome));
        });

        Ok(())
    }

    /// Wait for the most recent run to finish.
    ///
    /// Returns `Ok` right away if the runner was never started, and
    /// [`WadoError::CommandFailed`] if the process exited unsuccessfully.
    pub async fn wait(&self) -> Result<()> {
        let Some(mut done) = lock(&self.state).last.clone() else {
            return Ok(());
        };
        let outcome = match done.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };
        match outcome {
            Some(ExitOutcome::Success) => Ok(()),
            Some(ExitOutcome::Failed(code)) => Err(WadoError::CommandFailed {
                command: self.command(),
                code,
            }),
            Some(ExitOutcome::WaitError(msg)) => Err(io::Error::other(msg).into()),
            None => Err(io::Error::other("command reaper stopped before exit").into()),
        }
    }

    /// Stop the running process, if any.
    ///
    /// Interrupts the process group, force-terminates it after
    /// [`KILL_GRACE`], then polls until the OS no longer knows the pid.
    pub async fn kill(&self) -> Result<()> {
        let (pid, mut done) = {
            let state = lock(&self.state);
            match (state.pid, state.last.clone()) {
                (Some(pid), Some(done)) => (pid, done),
                _ => return Ok(()),
            }
        };

        info!(command = %self.spec, pid, "stopping command");
        if Platform::SUPPORTS_INTERRUPT {
            if let Err(err) = Platform::interrupt(pid) {
                warn!(command = %self.spec, pid, error = %err, "failed to interrupt process");
            }
            let exited = tokio::time::timeout(KILL_GRACE, done.wait_for(Option::is_some))
                .await
                .is_ok();
            if !exited {
                warn!(
                    command = %self.spec,
                    pid,
                    "process ignored interrupt; force-terminating"
                );
                if let Err(err) = Platform::hard_kill(pid) {
                    warn!(command = %self.spec, pid, error = %err, "failed to terminate process");
                }
            }
        } else if let Err(err) = Platform::hard_kill(pid) {
            warn!(command = %self.spec, pid, error = %err, "failed to terminate process");
        }

        loop {
            let cleared = lock(&self.state).pid != Some(pid);
            if cleared && !Platform::is_running(pid) {
                break;
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
        debug!(command = %self.spec, pid, "command stopped");
        Ok(())
    }

    pub async fn restart(&self) -> Result<()> {
        self.kill().await?;
        self.start()
    }
}

async fn pipe_output<R: AsyncRead + Unpin>(mut reader: R, sink: OutputSink) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if let Err(err) = sink.write(&buf[..n]) {
                    warn!(error = %err, "failed to write command output");
                }
            }
            Err(err) => {
                debug!(error = %err, "output stream closed");
                break;
            }
        }
    }
}

/// Give the copiers a bounded window to flush what the process wrote.
///
/// Copiers still blocked afterwards keep running detached until the last
/// holder of the pipe closes it.
async fn drain_output(copiers: Vec<JoinHandle<()>>, command: &str) {
    let deadline = tokio::time::Instant::now() + OUTPUT_DRAIN;
    for mut copier in copiers {
        if tokio::time::timeout_at(deadline, &mut copier).await.is_err() {
            debug!(command = %command, "output still held open after exit; detaching");
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}
