//! Fixed-size worker process pool
//!
//! The pool keeps one slot per worker (`0..n_workers`). Each occupied slot
//! holds the handle of a process that was started and has not yet been seen
//! dead. When a poll finds a dead process, the handle moves to the dead
//! history and the slot receives a freshly spawned replacement with a new PID.
//! A slot whose replacement failed to spawn stays vacant and is retried on
//! the next iteration.

use super::adapters::{ManagedProcess, ProcessAdapter, WorkerEntry, WorkerExit};
use crate::config::DEFAULT_POLL_INTERVAL;
use crate::{CoreError, Result};
use chrono::{DateTime, Utc};
use std::convert::Infallible;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// How often `wait_for_exit` re-checks liveness
const EXIT_POLL_STEP: Duration = Duration::from_millis(100);

/// Slot number and PID of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerInfo {
    /// Pool slot
    pub slot: usize,
    /// Process ID
    pub pid: u32,
}

/// Result of a liveness poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivenessReport {
    /// Workers currently running
    pub alive: Vec<WorkerInfo>,
    /// Workers that have exited but not yet been replaced
    pub dead: Vec<WorkerInfo>,
    /// Slots with no process because a respawn failed
    pub vacant: Vec<usize>,
}

/// A worker the pool observed dead during the current run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadWorker {
    /// Slot the worker occupied
    pub slot: usize,
    /// Its process ID
    pub pid: u32,
    /// Exit status, when the platform reported one
    pub exit: Option<WorkerExit>,
    /// When the death was observed
    pub observed_at: DateTime<Utc>,
}

impl fmt::Display for DeadWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {} (slot {}", self.pid, self.slot)?;
        if let Some(exit) = self.exit {
            write!(f, ", {exit}")?;
        }
        write!(f, ", seen {})", self.observed_at.format("%H:%M:%S"))
    }
}

struct WorkerSlot {
    index: usize,
    process: Option<Box<dyn ManagedProcess>>,
}

/// Keeps `n_workers` processes running `entry` alive
pub struct ProcessPool {
    adapter: Arc<dyn ProcessAdapter>,
    entry: WorkerEntry,
    n_workers: usize,
    poll_interval: Duration,
    slots: Option<Vec<WorkerSlot>>,
    dead: Vec<DeadWorker>,
}

impl fmt::Debug for ProcessPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessPool")
            .field("entry", &self.entry)
            .field("n_workers", &self.n_workers)
            .field("poll_interval", &self.poll_interval)
            .field("started", &self.slots.is_some())
            .field("dead", &self.dead.len())
            .finish()
    }
}

fn spawn_worker(
    adapter: &dyn ProcessAdapter,
    entry: &WorkerEntry,
    slot: usize,
) -> Result<Box<dyn ManagedProcess>> {
    let process = adapter.spawn(slot, entry)?;
    info!("Starting worker {} in slot {}", process.pid(), slot);
    Ok(process)
}

fn not_started() -> CoreError {
    CoreError::PreconditionError("the process pool must be started before use".to_string())
}

impl ProcessPool {
    /// Create a pool of `n_workers` processes running `entry`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `n_workers` is zero.
    pub fn new(
        adapter: Arc<dyn ProcessAdapter>,
        entry: WorkerEntry,
        n_workers: usize,
    ) -> Result<Self> {
        if n_workers == 0 {
            return Err(CoreError::ConfigurationError(
                "a process pool needs at least one worker".to_string(),
            ));
        }

        Ok(Self {
            adapter,
            entry,
            n_workers,
            poll_interval: DEFAULT_POLL_INTERVAL,
            slots: None,
            dead: Vec::new(),
        })
    }

    /// Set the delay between maintenance iterations
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Target number of workers
    pub fn n_workers(&self) -> usize {
        self.n_workers
    }

    /// Whether [`ProcessPool::start`] has been called
    pub fn is_started(&self) -> bool {
        self.slots.is_some()
    }

    /// Workers found dead during the current run, in the order observed
    pub fn dead_history(&self) -> &[DeadWorker] {
        &self.dead
    }

    /// Spawn all workers and enter a scope that stops them when dropped
    ///
    /// Clears the dead history. If the pool is already running, its workers
    /// are terminated first.
    ///
    /// # Errors
    ///
    /// If any spawn fails, the workers started so far are terminated and the
    /// spawn error is returned.
    pub fn start(&mut self) -> Result<PoolScope<'_>> {
        if self.slots.is_some() {
            warn!("Process pool restarted while running; stopping current workers");
            self.stop();
        }

        let mut slots = Vec::with_capacity(self.n_workers);
        for index in 0..self.n_workers {
            match spawn_worker(self.adapter.as_ref(), &self.entry, index) {
                Ok(process) => slots.push(WorkerSlot {
                    index,
                    process: Some(process),
                }),
                Err(e) => {
                    error!("Failed to start worker for slot {}: {}", index, e);
                    for slot in &mut slots {
                        if let Some(process) = slot.process.as_mut() {
                            info!("Terminating worker {}", process.pid());
                            if let Err(term_err) = process.terminate() {
                                warn!("Failed to terminate worker {}: {}", process.pid(), term_err);
                            }
                        }
                    }
                    return Err(e);
                }
            }
        }

        self.slots = Some(slots);
        self.dead.clear();
        Ok(PoolScope { pool: self })
    }

    /// Partition the current workers by liveness, asking the OS for each one
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PreconditionError`] if the pool was never started.
    pub fn poll(&mut self) -> Result<LivenessReport> {
        let slots = self.slots.as_mut().ok_or_else(not_started)?;

        let mut report = LivenessReport::default();
        for slot in slots.iter_mut() {
            match slot.process.as_mut() {
                Some(process) => {
                    let info = WorkerInfo {
                        slot: slot.index,
                        pid: process.pid(),
                    };
                    if process.is_alive() {
                        report.alive.push(info);
                    } else {
                        report.dead.push(info);
                    }
                }
                None => report.vacant.push(slot.index),
            }
        }
        Ok(report)
    }

    /// Number of workers currently alive (zero before start)
    pub fn alive_count(&mut self) -> usize {
        self.poll().map(|report| report.alive.len()).unwrap_or(0)
    }

    /// One maintenance iteration: record every dead worker and respawn its slot
    ///
    /// Returns the number of replacements started. Vacant slots are refilled
    /// too. A failed respawn is logged and leaves the slot vacant.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PreconditionError`] if the pool was never started.
    pub fn restart_dead(&mut self) -> Result<usize> {
        let Self {
            adapter,
            entry,
            slots,
            dead,
            ..
        } = self;
        let slots = slots.as_mut().ok_or_else(not_started)?;

        let mut restarted = 0;
        for slot in slots.iter_mut() {
            if let Some(process) = slot.process.as_mut() {
                if process.is_alive() {
                    continue;
                }
                let record = DeadWorker {
                    slot: slot.index,
                    pid: process.pid(),
                    exit: process.exit(),
                    observed_at: Utc::now(),
                };
                warn!("Restarting dead worker {}", record);
                dead.push(record);
                slot.process = None;
            }

            match spawn_worker(adapter.as_ref(), entry, slot.index) {
                Ok(process) => {
                    slot.process = Some(process);
                    restarted += 1;
                }
                Err(e) => error!(
                    "Failed to restart worker for slot {}, will retry: {}",
                    slot.index, e
                ),
            }
        }
        Ok(restarted)
    }

    /// Keep the pool at full size until the calling future is dropped
    ///
    /// Each iteration polls every worker, replaces the dead ones and sleeps
    /// for the poll interval. Never returns `Ok`; stop it by dropping the
    /// future (for example from a `tokio::select!`).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PreconditionError`] if the pool was never started.
    pub async fn maintain(&mut self) -> Result<Infallible> {
        if self.slots.is_none() {
            return Err(CoreError::PreconditionError(
                "the process pool must be started before maintain".to_string(),
            ));
        }

        debug!(
            "Maintaining {} workers every {:?}",
            self.n_workers, self.poll_interval
        );
        loop {
            self.restart_dead()?;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Send SIGTERM to every worker still alive. Does not wait.
    ///
    /// Returns the number of workers signalled; calling it again once they
    /// are gone is a no-op.
    pub fn stop(&mut self) -> usize {
        let Some(slots) = self.slots.as_mut() else {
            return 0;
        };

        let mut signalled = 0;
        for process in slots.iter_mut().filter_map(|slot| slot.process.as_mut()) {
            if !process.is_alive() {
                continue;
            }
            info!("Terminating worker {}", process.pid());
            match process.terminate() {
                Ok(()) => signalled += 1,
                Err(e) => warn!("Failed to terminate worker {}: {}", process.pid(), e),
            }
        }
        signalled
    }

    /// Wait until no worker is alive or `grace` elapses
    ///
    /// Returns how many workers are still alive.
    pub async fn wait_for_exit(&mut self, grace: Duration) -> usize {
        let deadline = Instant::now() + grace;
        loop {
            let alive = self.alive_count();
            let now = Instant::now();
            if alive == 0 || now >= deadline {
                return alive;
            }
            tokio::time::sleep(EXIT_POLL_STEP.min(deadline - now)).await;
        }
    }

    /// SIGKILL every worker still alive
    ///
    /// Returns the number of workers killed.
    pub fn kill_remaining(&mut self) -> usize {
        let Some(slots) = self.slots.as_mut() else {
            return 0;
        };

        let mut killed = 0;
        for process in slots.iter_mut().filter_map(|slot| slot.process.as_mut()) {
            if !process.is_alive() {
                continue;
            }
            warn!("Worker {} ignored SIGTERM, killing it", process.pid());
            match process.kill() {
                Ok(()) => killed += 1,
                Err(e) => error!("Failed to kill worker {}: {}", process.pid(), e),
            }
        }
        killed
    }
}

/// A started pool; stops every live worker when dropped
#[derive(Debug)]
pub struct PoolScope<'a> {
    pool: &'a mut ProcessPool,
}

impl Deref for PoolScope<'_> {
    type Target = ProcessPool;

    fn deref(&self) -> &ProcessPool {
        self.pool
    }
}

impl DerefMut for PoolScope<'_> {
    fn deref_mut(&mut self) -> &mut ProcessPool {
        self.pool
    }
}

impl Drop for PoolScope<'_> {
    fn drop(&mut self) {
        self.pool.stop();
    }
}
