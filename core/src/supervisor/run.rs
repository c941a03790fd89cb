//! Scoped supervisor run
//!
//! [`supervise`] starts the pool, keeps it at full size until the interrupt
//! future resolves, then terminates every live worker and gives them a grace
//! period to exit on their own before killing the rest. An interrupt is the
//! normal way a run ends, so it is reported through [`RunSummary`] and not as
//! an error.

use super::pool::{DeadWorker, ProcessPool};
use crate::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// What happened during a supervisor run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Workers that died while the pool was being maintained
    pub dead: Vec<DeadWorker>,
    /// Workers that were sent SIGTERM at shutdown
    pub terminated: usize,
    /// Workers still alive after the grace period (and then killed)
    pub killed: usize,
}

/// Run `pool` until `interrupt` resolves
///
/// # Errors
///
/// Fails if the pool cannot be started. Workers started before the failure
/// are terminated.
pub async fn supervise<F>(pool: &mut ProcessPool, grace: Duration, interrupt: F) -> Result<RunSummary>
where
    F: Future<Output = ()>,
{
    info!("Starting process pool with {} workers", pool.n_workers());

    let mut scope = pool.start()?;
    tokio::select! {
        result = scope.maintain() => {
            // maintain only comes back with an error
            let never = result?;
            match never {}
        }
        () = interrupt => {
            info!("Interrupted, stopping {} workers", scope.n_workers());
        }
    }

    let terminated = scope.stop();
    let remaining = scope.wait_for_exit(grace).await;
    let killed = if remaining > 0 {
        scope.kill_remaining()
    } else {
        0
    };
    drop(scope);

    info!("Closing supervisor");

    let dead = pool.dead_history().to_vec();
    if !dead.is_empty() {
        let listing = dead
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        warn!(
            "{} worker(s) died unexpectedly during this run: {}",
            dead.len(),
            listing
        );
    }

    Ok(RunSummary {
        dead,
        terminated,
        killed,
    })
}
