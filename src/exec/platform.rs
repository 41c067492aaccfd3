// src/exec/platform.rs

//! Per-platform process-group control.

use std::io;

use tokio::process::Command;

/// Operations the runner needs from the OS to stop a command and everything
/// it spawned.
pub trait ProcessControl {
    /// Whether a cooperative interrupt exists. Without it, `kill` goes
    /// straight to [`ProcessControl::hard_kill`].
    const SUPPORTS_INTERRUPT: bool;

    /// Prepare the command so it runs in its own process group.
    fn configure(cmd: &mut Command);

    /// Ask the process group to stop.
    fn interrupt(pid: u32) -> io::Result<()>;

    /// Force the process group to stop.
    fn hard_kill(pid: u32) -> io::Result<()>;

    /// Whether the OS still has an entry for `pid`.
    fn is_running(pid: u32) -> bool;
}

#[cfg(unix)]
pub type Platform = UnixControl;
#[cfg(windows)]
pub type Platform = WindowsControl;

#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
pub struct UnixControl;

#[cfg(unix)]
impl UnixControl {
    fn pid(pid: u32) -> io::Result<nix::unistd::Pid> {
        i32::try_from(pid)
            .map(nix::unistd::Pid::from_raw)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))
    }

    fn signal_group(pid: u32, signal: nix::sys::signal::Signal) -> io::Result<()> {
        use nix::errno::Errno;
        match nix::sys::signal::killpg(Self::pid(pid)?, signal) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }
}

#[cfg(unix)]
impl ProcessControl for UnixControl {
    const SUPPORTS_INTERRUPT: bool = true;

    fn configure(cmd: &mut Command) {
        cmd.process_group(0);
    }

    fn interrupt(pid: u32) -> io::Result<()> {
        Self::signal_group(pid, nix::sys::signal::Signal::SIGINT)
    }

    fn hard_kill(pid: u32) -> io::Result<()> {
        Self::signal_group(pid, nix::sys::signal::Signal::SIGKILL)
    }

    fn is_running(pid: u32) -> bool {
        use nix::errno::Errno;
        let Ok(pid) = Self::pid(pid) else {
            return false;
        };
        !matches!(nix::sys::signal::kill(pid, None), Err(Errno::ESRCH))
    }
}

#[cfg(windows)]
#[derive(Debug, Clone, Copy)]
pub struct WindowsControl;

#[cfg(windows)]
impl ProcessControl for WindowsControl {
    const SUPPORTS_INTERRUPT: bool = false;

    fn configure(cmd: &mut Command) {
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }

    fn interrupt(pid: u32) -> io::Result<()> {
        Self::hard_kill(pid)
    }

    fn hard_kill(pid: u32) -> io::Result<()> {
        let status = std::process::Command::new("taskkill")
            .args(["/T", "/F", "/PID", &pid.to_string()])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()?;
        if status.success() || !Self::is_running(pid) {
            Ok(())
        } else {
            Err(io::Error::other(format!("taskkill exited with {status}")))
        }
    }

    fn is_running(pid: u32) -> bool {
        std::process::Command::new("tasklist")
            .args(["/NH", "/FI", &format!("PID eq {pid}")])
            .output()
            .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
            .unwrap_or(false)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn interrupt_stops_a_process_group() {
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        UnixControl::configure(&mut cmd);
        let mut child = cmd.spawn().unwrap();
        let pid = child.id().unwrap();

        assert!(UnixControl::is_running(pid));
        UnixControl::interrupt(pid).unwrap();
        let status = child.wait().await.unwrap();
        assert!(!status.success());
        assert!(!UnixControl::is_running(pid));
    }

    #[test]
    fn signalling_a_missing_group_is_not_an_error() {
        // Max pid on Linux is far below this.
        assert!(UnixControl::hard_kill(i32::MAX as u32).is_ok());
    }
}
