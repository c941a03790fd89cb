//! Core functionality for respawn
//!
//! This crate contains the error types, startup configuration, Unix process
//! primitives and the process pool supervisor shared by the `respawn` binary
//! and its worker processes.

pub mod config;
pub mod error;
#[cfg(unix)]
pub mod process;
pub mod signals;
pub mod supervisor;

#[cfg(test)]
mod error_tests;

pub use config::{parse_worker_count, worker_count_from_env, PoolSettings};
pub use error::{CoreError, Result};
pub use signals::ShutdownSignals;

/// Core utilities and helper functions
pub mod utils {
    use tracing::debug;

    /// Initialize tracing for the application
    ///
    /// `RUST_LOG` takes precedence over `level`. Lines carry the timestamp,
    /// level, target and line number; callers wrap their work in a `process`
    /// span so each line also names the process it came from.
    pub fn init_tracing(level: &str) -> crate::Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .try_init()
            .map_err(|e| crate::CoreError::InitializationError(e.to_string()))?;

        debug!("Tracing initialized with level: {}", level);
        Ok(())
    }
}
