//! Process adapters for abstracting process management
//!
//! The pool never touches OS processes directly. It asks a [`ProcessAdapter`]
//! to start a worker for a slot and gets back a [`ManagedProcess`] it can poll
//! and signal. [`UnixProcessAdapter`] is the real implementation;
//! [`MockProcessAdapter`] keeps everything in memory for tests.

use crate::{CoreError, Result};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Environment variable telling a worker which pool slot it occupies
pub const WORKER_SLOT_ENV: &str = "RESPAWN_WORKER_SLOT";

/// What a worker process runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEntry {
    /// Program to execute
    pub program: PathBuf,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
}

impl WorkerEntry {
    /// Entry point running `program` with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Entry point that re-executes the current binary with `subcommand`
    ///
    /// # Errors
    ///
    /// Fails if the path of the running executable cannot be determined.
    pub fn current_exe(subcommand: &str) -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| {
            CoreError::InitializationError(format!("Cannot locate current executable: {e}"))
        })?;
        Ok(Self::new(exe).arg(subcommand))
    }

    /// Append an argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add an environment variable
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for WorkerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a worker process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    /// Exit code, if the process exited normally
    pub exit_code: Option<i32>,
    /// Terminating signal, if the process was killed by one
    pub signal: Option<i32>,
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.exit_code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(signal)) => write!(f, "signal {signal}"),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

/// Trait for starting worker processes
pub trait ProcessAdapter: Send + Sync {
    /// Spawn a new process running `entry` for pool slot `slot`
    fn spawn(&self, slot: usize, entry: &WorkerEntry) -> Result<Box<dyn ManagedProcess>>;
}

/// A running (or exited) worker process
///
/// All operations are synchronous so the pool can release its workers from
/// `Drop`.
pub trait ManagedProcess: Send + Sync {
    /// Get the process ID
    fn pid(&self) -> u32;

    /// Ask the OS whether the process is still running. Never cached.
    fn is_alive(&mut self) -> bool;

    /// How the process ended, if it has been observed to exit
    fn exit(&self) -> Option<WorkerExit>;

    /// Request a clean exit (SIGTERM). Does not wait.
    fn terminate(&mut self) -> Result<()>;

    /// Kill the process forcefully (SIGKILL)
    fn kill(&mut self) -> Result<()>;
}

/// Unix process adapter spawning each worker in its own process group
#[cfg(unix)]
#[derive(Copy, Clone, Debug, Default)]
pub struct UnixProcessAdapter;

#[cfg(unix)]
impl UnixProcessAdapter {
    /// Create a new Unix process adapter
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl ProcessAdapter for UnixProcessAdapter {
    fn spawn(&self, slot: usize, entry: &WorkerEntry) -> Result<Box<dyn ManagedProcess>> {
        use crate::process::unix;

        debug!("Spawning Unix process for slot {}: {}", slot, entry);

        let program = entry.program.to_str().ok_or_else(|| {
            CoreError::ProcessSpawn(format!(
                "Program path is not valid unicode: {}",
                entry.program.display()
            ))
        })?;
        let args: Vec<&str> = entry.args.iter().map(String::as_str).collect();
        let slot_value = slot.to_string();
        let mut envs: Vec<(&str, &str)> = entry
            .env
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        envs.push((WORKER_SLOT_ENV, slot_value.as_str()));

        let child = unix::spawn(program, &args, &envs)?;

        Ok(Box::new(UnixManagedProcess { child }))
    }
}

/// Unix managed process implementation
#[cfg(unix)]
struct UnixManagedProcess {
    child: crate::process::unix::ChildProcess,
}

#[cfg(unix)]
impl ManagedProcess for UnixManagedProcess {
    fn pid(&self) -> u32 {
        self.child.pid()
    }

    fn is_alive(&mut self) -> bool {
        match self.child.is_alive() {
            Ok(alive) => alive,
            Err(e) => {
                // The child can no longer be waited on; it is not ours to run.
                tracing::warn!("Treating process {} as dead: {}", self.child.pid(), e);
                false
            }
        }
    }

    fn exit(&self) -> Option<WorkerExit> {
        self.child.exit_status().map(|status| {
            let (exit_code, signal) = crate::process::unix::exit_parts(status);
            WorkerExit { exit_code, signal }
        })
    }

    fn terminate(&mut self) -> Result<()> {
        if !self.is_alive() {
            return Ok(());
        }
        crate::process::unix::signal_term_group(&self.child)
    }

    fn kill(&mut self) -> Result<()> {
        if !self.is_alive() {
            return Ok(());
        }
        crate::process::unix::signal_kill_group(&self.child)
    }
}

const MOCK_SIGTERM: i32 = 15;
const MOCK_SIGKILL: i32 = 9;

/// Shared state of one mock process
#[derive(Debug)]
struct MockState {
    pid: u32,
    slot: usize,
    alive: AtomicBool,
    terminate_requests: AtomicUsize,
    exit: Mutex<Option<WorkerExit>>,
}

impl MockState {
    fn end(&self, exit: WorkerExit) {
        if self.alive.swap(false, Ordering::SeqCst) {
            if let Ok(mut slot) = self.exit.lock() {
                *slot = Some(exit);
            }
        }
    }
}

/// Test-side handle on a process spawned by [`MockProcessAdapter`]
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<MockState>,
}

impl MockHandle {
    /// PID assigned to the mock process
    pub fn pid(&self) -> u32 {
        self.state.pid
    }

    /// Pool slot the process was spawned for
    pub fn slot(&self) -> usize {
        self.state.slot
    }

    /// Whether the mock process is still running
    pub fn is_alive(&self) -> bool {
        self.state.alive.load(Ordering::SeqCst)
    }

    /// Number of SIGTERM requests received
    pub fn terminate_requests(&self) -> usize {
        self.state.terminate_requests.load(Ordering::SeqCst)
    }

    /// Make the process exit on its own with `code`
    pub fn exit_with(&self, code: i32) {
        self.state.end(WorkerExit {
            exit_code: Some(code),
            signal: None,
        });
    }

    /// Kill the process from outside the pool
    pub fn kill_externally(&self) {
        self.state.end(WorkerExit {
            exit_code: None,
            signal: Some(MOCK_SIGKILL),
        });
    }
}

#[derive(Debug, Default)]
struct MockAdapterInner {
    next_pid: AtomicU32,
    spawns_before_failing: AtomicUsize,
    failing_spawns: AtomicUsize,
    ignore_terminate: AtomicBool,
    spawned: Mutex<Vec<MockHandle>>,
}

/// Mock process adapter for testing
///
/// PIDs are handed out sequentially and never reused.
#[derive(Debug, Clone)]
pub struct MockProcessAdapter {
    inner: Arc<MockAdapterInner>,
}

impl MockProcessAdapter {
    /// Create a new mock adapter
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MockAdapterInner {
                next_pid: AtomicU32::new(1000),
                ..Default::default()
            }),
        }
    }

    /// Create a mock whose processes ignore SIGTERM and only die on SIGKILL
    pub fn ignoring_terminate() -> Self {
        let adapter = Self::new();
        adapter.inner.ignore_terminate.store(true, Ordering::SeqCst);
        adapter
    }

    /// Make the next `count` spawn attempts fail
    pub fn fail_next_spawns(&self, count: usize) {
        self.fail_spawns_after(0, count);
    }

    /// Let `successes` spawns through, then fail the following `count`
    pub fn fail_spawns_after(&self, successes: usize, count: usize) {
        self.inner
            .spawns_before_failing
            .store(successes, Ordering::SeqCst);
        self.inner.failing_spawns.store(count, Ordering::SeqCst);
    }

    /// Every process spawned so far, in spawn order
    pub fn spawned(&self) -> Vec<MockHandle> {
        self.inner
            .spawned
            .lock()
            .map(|spawned| spawned.clone())
            .unwrap_or_default()
    }

    /// Processes spawned so far that are still alive
    pub fn alive(&self) -> Vec<MockHandle> {
        self.spawned().into_iter().filter(MockHandle::is_alive).collect()
    }

    /// Look up a spawned process by PID
    pub fn by_pid(&self, pid: u32) -> Option<MockHandle> {
        self.spawned().into_iter().find(|h| h.pid() == pid)
    }
}

impl Default for MockProcessAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessAdapter for MockProcessAdapter {
    fn spawn(&self, slot: usize, entry: &WorkerEntry) -> Result<Box<dyn ManagedProcess>> {
        debug!("Spawning mock process for slot {}: {}", slot, entry);

        let failing = self.inner.failing_spawns.load(Ordering::SeqCst);
        if failing > 0 {
            let skip = self.inner.spawns_before_failing.load(Ordering::SeqCst);
            if skip > 0 {
                self.inner
                    .spawns_before_failing
                    .store(skip - 1, Ordering::SeqCst);
            } else {
                self.inner.failing_spawns.store(failing - 1, Ordering::SeqCst);
                return Err(CoreError::ProcessSpawn(format!(
                    "mock spawn failure for slot {slot}"
                )));
            }
        }

        let state = Arc::new(MockState {
            pid: self.inner.next_pid.fetch_add(1, Ordering::SeqCst),
            slot,
            alive: AtomicBool::new(true),
            terminate_requests: AtomicUsize::new(0),
            exit: Mutex::new(None),
        });

        if let Ok(mut spawned) = self.inner.spawned.lock() {
            spawned.push(MockHandle {
                state: Arc::clone(&state),
            });
        }

        Ok(Box::new(MockManagedProcess {
            state,
            ignore_terminate: self.inner.ignore_terminate.load(Ordering::SeqCst),
        }))
    }
}

/// Mock managed process for testing
struct MockManagedProcess {
    state: Arc<MockState>,
    ignore_terminate: bool,
}

impl ManagedProcess for MockManagedProcess {
    fn pid(&self) -> u32 {
        self.state.pid
    }

    fn is_alive(&mut self) -> bool {
        self.state.alive.load(Ordering::SeqCst)
    }

    fn exit(&self) -> Option<WorkerExit> {
        self.state.exit.lock().ok().and_then(|exit| *exit)
    }

    fn terminate(&mut self) -> Result<()> {
        debug!("Terminating mock process {}", self.state.pid);
        self.state.terminate_requests.fetch_add(1, Ordering::SeqCst);
        if !self.ignore_terminate {
            self.state.end(WorkerExit {
                exit_code: None,
                signal: Some(MOCK_SIGTERM),
            });
        }
        Ok(())
    }

    fn kill(&mut self) -> Result<()> {
        debug!("Killing mock process {}", self.state.pid);
        self.state.end(WorkerExit {
            exit_code: None,
            signal: Some(MOCK_SIGKILL),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> WorkerEntry {
        WorkerEntry::new("/bin/worker").arg("run")
    }

    #[test]
    fn test_worker_entry_display() {
        let entry = WorkerEntry::new("/usr/bin/respawn")
            .arg("worker")
            .env("RUST_LOG", "debug");
        assert_eq!(entry.to_string(), "/usr/bin/respawn worker");
        assert_eq!(entry.env, vec![("RUST_LOG".to_string(), "debug".to_string())]);
    }

    #[test]
    fn test_worker_exit_display() {
        let code = WorkerExit {
            exit_code: Some(1),
            signal: None,
        };
        let signal = WorkerExit {
            exit_code: None,
            signal: Some(9),
        };
        assert_eq!(code.to_string(), "exit code 1");
        assert_eq!(signal.to_string(), "signal 9");
    }

    #[test]
    fn test_mock_adapter_spawn() {
        let adapter = MockProcessAdapter::new();
        let mut first = adapter.spawn(0, &entry()).unwrap();
        let second = adapter.spawn(1, &entry()).unwrap();

        assert!(first.is_alive());
        assert_ne!(first.pid(), second.pid());
        assert_eq!(adapter.spawned().len(), 2);
        assert_eq!(adapter.by_pid(second.pid()).unwrap().slot(), 1);
    }

    #[test]
    fn test_mock_process_terminate() {
        let adapter = MockProcessAdapter::new();
        let mut process = adapter.spawn(0, &entry()).unwrap();

        process.terminate().unwrap();

        assert!(!process.is_alive());
        assert_eq!(
            process.exit(),
            Some(WorkerExit {
                exit_code: None,
                signal: Some(15)
            })
        );
        assert_eq!(adapter.spawned()[0].terminate_requests(), 1);
    }

    #[test]
    fn test_mock_process_ignoring_terminate_needs_kill() {
        let adapter = MockProcessAdapter::ignoring_terminate();
        let mut process = adapter.spawn(0, &entry()).unwrap();

        process.terminate().unwrap();
        assert!(process.is_alive());

        process.kill().unwrap();
        assert!(!process.is_alive());
        assert_eq!(process.exit().unwrap().signal, Some(9));
    }

    #[test]
    fn test_mock_external_exit_keeps_first_status() {
        let adapter = MockProcessAdapter::new();
        let mut process = adapter.spawn(0, &entry()).unwrap();
        let handle = adapter.by_pid(process.pid()).unwrap();

        handle.exit_with(1);
        handle.kill_externally();

        assert!(!process.is_alive());
        assert_eq!(process.exit().unwrap().exit_code, Some(1));
    }

    #[test]
    fn test_mock_spawn_failures() {
        let adapter = MockProcessAdapter::new();
        adapter.fail_next_spawns(1);

        assert!(matches!(
            adapter.spawn(0, &entry()),
            Err(CoreError::ProcessSpawn(_))
        ));
        assert!(adapter.spawn(0, &entry()).is_ok());
    }
}
