//! Unix process management with safe spawn/kill using process groups
//!
//! Every worker is started with `setsid()` so it leads its own session and
//! process group. Signals are sent to the whole group, SIGTERM to request a
//! clean exit and SIGKILL for stragglers.
//!
//! Liveness is answered by a non-blocking `waitpid` through
//! [`ChildProcess::try_wait`]; the exit status is remembered once the child
//! has been reaped.

// Allow unsafe code for this module since process management requires libc::setsid() calls
#![allow(unsafe_code)]

use crate::{CoreError, Result};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::{debug, error};

/// A child process managed with Unix process groups
#[derive(Debug)]
pub struct ChildProcess {
    /// The process ID of the spawned process
    pid: Pid,
    /// The underlying Child handle for waiting and status checking
    child: Child,
    /// Exit status, once observed
    status: Option<ExitStatus>,
}

impl ChildProcess {
    /// Get the process ID
    pub fn pid(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    /// Get the process group ID (same as PID for session leaders)
    pub fn pgid(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    /// Exit status if the process has already been observed to exit
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.status
    }

    /// Wait for the process to exit and return its exit status
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let status = self.child.wait().await.map_err(|e| {
            CoreError::ProcessWait(format!("Failed to wait for process {}: {}", self.pid, e))
        })?;
        self.status = Some(status);
        Ok(status)
    }

    /// Try to wait for the process to exit without blocking
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        if let Some(status) = self.status {
            return Ok(Some(status));
        }
        let status = self.child.try_wait().map_err(|e| {
            CoreError::ProcessWait(format!(
                "Failed to try_wait for process {}: {}",
                self.pid, e
            ))
        })?;
        self.status = status;
        Ok(status)
    }

    /// Whether the process is still running, asking the OS every time
    pub fn is_alive(&mut self) -> Result<bool> {
        Ok(self.try_wait()?.is_none())
    }
}

/// Spawn a new process in its own process group
///
/// `envs` are added to the inherited environment. Stdout and stderr are
/// inherited so worker logs interleave with the supervisor's; stdin is closed.
///
/// ## Example
///
/// ```rust,no_run
/// # async fn demo() -> respawn_core::Result<()> {
/// use respawn_core::process::unix::spawn;
///
/// let child = spawn("sleep", &["30"], &[])?;
/// println!("Spawned process with PID: {}", child.pid());
/// # Ok(())
/// # }
/// ```
pub fn spawn(cmd: &str, args: &[&str], envs: &[(&str, &str)]) -> Result<ChildProcess> {
    debug!("Spawning process: {} {:?}", cmd, args);

    let mut command = Command::new(cmd);
    command.args(args);
    command.envs(envs.iter().copied());
    command.stdin(Stdio::null());
    command.stdout(Stdio::inherit());
    command.stderr(Stdio::inherit());

    // Safety: setsid() is async-signal-safe and appropriate for use in pre_exec
    #[deny(unsafe_op_in_unsafe_fn)]
    unsafe {
        command.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = command.spawn().map_err(|e| {
        error!("Failed to spawn process '{}': {}", cmd, e);
        CoreError::ProcessSpawn(format!("Failed to spawn '{}': {}", cmd, e))
    })?;

    let raw_pid = child
        .id()
        .ok_or_else(|| CoreError::ProcessSpawn("Spawned child did not have a PID".to_string()))?;
    let pid = Pid::from_raw(raw_pid as i32);
    debug!("Successfully spawned process {} in new process group", pid);

    Ok(ChildProcess {
        pid,
        child,
        status: None,
    })
}

fn signal_group(child: &ChildProcess, signal: Signal) -> Result<()> {
    debug!("Sending {} to process group {}", signal, child.pid);

    match killpg(child.pid, signal) {
        Ok(()) => Ok(()),
        // ESRCH: the group is gone. EPERM: it exited and the id changed hands.
        Err(nix::errno::Errno::ESRCH) | Err(nix::errno::Errno::EPERM) => {
            debug!("Process group {} already exited", child.pid);
            Ok(())
        }
        Err(e) => {
            error!(
                "Failed to send {} to process group {}: {}",
                signal, child.pid, e
            );
            Err(CoreError::ProcessSignal(format!(
                "Failed to send {} to process group {}: {}",
                signal, child.pid, e
            )))
        }
    }
}

/// Send SIGTERM to the process group for graceful termination
///
/// A group that no longer exists is treated as success.
pub fn signal_term_group(child: &ChildProcess) -> Result<()> {
    signal_group(child, Signal::SIGTERM)
}

/// Send SIGKILL to the process group for forceful termination
///
/// A group that no longer exists is treated as success.
pub fn signal_kill_group(child: &ChildProcess) -> Result<()> {
    signal_group(child, Signal::SIGKILL)
}

/// Split an exit status into `(exit_code, signal)`
pub fn exit_parts(status: ExitStatus) -> (Option<i32>, Option<i32>) {
    match status.code() {
        Some(code) => (Some(code), None),
        None => (None, status.signal()),
    }
}
