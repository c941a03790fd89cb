//! The `respawn` binary: a process pool supervisor and the worker it runs
//!
//! Without a subcommand the binary supervises a pool of workers. Each worker is
//! the same binary re-executed with the hidden `worker` subcommand.

pub mod error;


pub use error::{DaemonError, Result};

use clap::{Parser, Subcommand};
use respawn_core::config::{parse_worker_count, worker_count_from_env, PoolSettings};
use respawn_core::supervisor::{RunSummary, WORKER_SLOT_ENV};
use std::time::Duration;
use tracing::{info, Span};
use worker::WorkerConfig;

/// Command line of the `respawn` binary
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "respawn")]
#[command(about = "Keep a pool of worker processes alive until interrupted")]
#[command(version)]
pub struct Cli {
    /// What to run (the supervisor when absent)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Number of workers (defaults to $N_WORKERS, then 4)
    #[arg(long, value_name = "N")]
    pub workers: Option<String>,

    /// Seconds workers get to exit after SIGTERM before being killed
    #[arg(long, default_value_t = 5)]
    pub grace_secs: u64,

    /// Milliseconds between two liveness checks
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the worker loop (started by the supervisor)
    #[command(hide = true)]
    Worker,
}

impl Cli {
    /// Whether this invocation runs a worker rather than the supervisor
    pub fn is_worker(&self) -> bool {
        matches!(self.command, Some(Command::Worker))
    }

    /// Resolve and validate supervisor settings
    ///
    /// `--workers` wins over `N_WORKERS`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid worker count or a zero
    /// poll interval.
    pub fn pool_settings(&self) -> Result<PoolSettings> {
        let workers = match self.workers.as_deref() {
            Some(raw) => parse_worker_count(Some(raw))?,
            None => worker_count_from_env()?,
        };

        let settings = PoolSettings {
            workers,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            grace_period: Duration::from_secs(self.grace_secs),
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Span wrapping every log line of this process
pub fn process_span(cli: &Cli) -> Span {
    let name = if cli.is_worker() {
        match std::env::var(WORKER_SLOT_ENV) {
            Ok(slot) => format!("worker-{slot}"),
            Err(_) => "worker".to_string(),
        }
    } else {
        "supervisor".to_string()
    };
    tracing::info_span!("process", name = %name)
}

/// Run whatever `cli` asks for
///
/// # Errors
///
/// See [`run_supervisor`] and [`run_worker`].
pub async fn run(cli: Cli) -> Result<()> {
    if cli.is_worker() {
        run_worker().await
    } else {
        let settings = cli.pool_settings()?;
        run_supervisor(settings, &cli.log_level).await.map(|_| ())
    }
}

/// Run the worker loop until SIGTERM
///
/// # Errors
///
/// Returns [`worker::WorkerError::Fatal`] when a task fails fatally.
pub async fn run_worker() -> Result<()> {
    let stats = worker::work(WorkerConfig::default()).await?;
    info!("Worker finished after {} task(s)", stats.executed);
    Ok(())
}

/// Supervise a pool of `respawn worker` processes until interrupted
///
/// # Errors
///
/// Fails if the signal handlers cannot be installed, the executable path
/// cannot be resolved or the initial workers cannot be spawned.
#[cfg(unix)]
pub async fn run_supervisor(settings: PoolSettings, log_level: &str) -> Result<RunSummary> {
    use respawn_core::supervisor::{supervise, ProcessPool, UnixProcessAdapter, WorkerEntry};
    use respawn_core::{CoreError, ShutdownSignals};
    use std::sync::Arc;

    let mut signals = ShutdownSignals::install().map_err(CoreError::from)?;

    let entry = WorkerEntry::current_exe("worker")?
        .arg("--log-level")
        .arg(log_level);
    let mut pool = ProcessPool::new(Arc::new(UnixProcessAdapter::new()), entry, settings.workers)?
        .with_poll_interval(settings.poll_interval);

    let interrupt = async move {
        let name = signals.recv().await;
        info!("Received signal {}", name);
    };

    let summary = supervise(&mut pool, settings.grace_period, interrupt).await?;
    Ok(summary)
}

/// Supervise a pool of `respawn worker` processes until interrupted
///
/// # Errors
///
/// Always fails: workers need Unix process groups.
#[cfg(not(unix))]
pub async fn run_supervisor(_settings: PoolSettings, _log_level: &str) -> Result<RunSummary> {
    Err(respawn_core::CoreError::InitializationError(
        "process supervision is only supported on Unix".to_string(),
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["respawn", "--workers", "3"]).unwrap();
        assert!(!cli.is_worker());
        assert_eq!(cli.log_level, "info");

        let settings = cli.pool_settings().unwrap();
        assert_eq!(settings.workers, 3);
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.grace_period, Duration::from_secs(5));
    }

    #[test]
    fn test_worker_subcommand() {
        let cli = Cli::try_parse_from(["respawn", "worker", "--log-level", "debug"]).unwrap();
        assert!(cli.is_worker());
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_invalid_worker_flag_is_configuration_error() {
        for raw in ["0", "four", "1.5"] {
            let cli = Cli::try_parse_from(["respawn", "--workers", raw]).unwrap();
            let err = cli.pool_settings().unwrap_err();
            assert_eq!(err.exit_code(), 2, "{raw}");
        }
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let cli =
            Cli::try_parse_from(["respawn", "--workers", "2", "--poll-interval-ms", "0"]).unwrap();
        assert_eq!(cli.pool_settings().unwrap_err().exit_code(), 2);
    }
}
