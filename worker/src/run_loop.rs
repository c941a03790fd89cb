//! The worker loop
//!
//! Each iteration picks one task by weight and runs it to completion, then
//! pauses. Shutdown is observed at iteration boundaries and during pauses:
//! a task that is already running is allowed to finish (cooperative tasks,
//! like [`LongWait`](crate::tasks::LongWait), finish early).

use crate::error::{Result, TaskError, WorkerError};
use crate::registry::{TaskContext, TaskRegistry};
use crate::shutdown::Shutdown;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, error, info};

/// Worker loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Pause between two tasks
    pub pause: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pause: Duration::from_secs(1),
        }
    }
}

/// What the loop did before it stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Tasks started
    pub executed: u64,
    /// Tasks that failed recoverably
    pub recovered: u64,
}

/// Run tasks until `shutdown` is requested
///
/// # Errors
///
/// Returns [`WorkerError::Fatal`] as soon as a task fails fatally; no further
/// task is started.
pub async fn run_loop<R>(
    registry: &TaskRegistry,
    shutdown: Shutdown,
    config: WorkerConfig,
    rng: &mut R,
) -> Result<LoopStats>
where
    R: Rng + Send,
{
    let ctx = TaskContext::new(shutdown);
    let mut stats = LoopStats::default();

    while !ctx.shutdown_requested() {
        let task = registry.select(rng);
        debug!("Running task {}", task.name());
        stats.executed += 1;

        match task.run(&ctx).await {
            Ok(()) => {}
            Err(TaskError::Recoverable(reason)) => {
                stats.recovered += 1;
                error!("Task {} failed: {}", task.name(), reason);
            }
            Err(TaskError::Fatal { code, reason }) => {
                error!("Task {} failed fatally: {}", task.name(), reason);
                return Err(WorkerError::Fatal {
                    task: task.name().to_string(),
                    code,
                    reason,
                });
            }
        }

        if !ctx.sleep(config.pause).await {
            break;
        }
    }

    info!(
        "Exiting worker after {} task(s), {} recovered failure(s)",
        stats.executed, stats.recovered
    );
    Ok(stats)
}
