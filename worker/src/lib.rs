//! Worker side of respawn
//!
//! A worker process repeatedly picks a simulated task from a weighted
//! [`TaskRegistry`], runs it and pauses. SIGTERM from the supervisor is turned
//! into a [`Shutdown`] request so the loop can end between tasks instead of
//! being cut off mid-task.

pub mod error;
pub mod registry;
pub mod run_loop;
pub mod shutdown;
pub mod signals;
pub mod tasks;

pub use error::{Result, TaskError, WorkerError};
pub use registry::{Task, TaskContext, TaskRegistry, TaskRegistryBuilder};
pub use run_loop::{run_loop, LoopStats, WorkerConfig};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use signals::install_termination_handler;
pub use tasks::{default_registry, KnownFailure, LongWait, UnexpectedExit};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

/// Run the default task mix until a termination signal arrives
///
/// # Errors
///
/// Fails if the signal handlers cannot be installed, or with
/// [`WorkerError::Fatal`] when a task fails fatally.
pub async fn work(config: WorkerConfig) -> Result<LoopStats> {
    let registry = default_registry()?;
    let (trigger, shutdown) = Shutdown::new();
    let handler = install_termination_handler(trigger)?;

    info!("Worker started with tasks {:?}", registry);
    let mut rng = StdRng::from_entropy();
    let result = run_loop(&registry, shutdown, config, &mut rng).await;

    handler.abort();
    result
}
