//! Startup configuration for the supervisor
//!
//! The worker count comes from the `N_WORKERS` environment variable (or the
//! `--workers` flag, which takes precedence). An absent or empty value falls
//! back to [`DEFAULT_WORKERS`]; anything else that is not a positive integer is
//! rejected instead of silently defaulted.

use crate::{CoreError, Result};
use std::env::{self, VarError};
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the worker count
pub const WORKERS_ENV: &str = "N_WORKERS";

/// Worker count used when nothing is configured
pub const DEFAULT_WORKERS: usize = 4;

/// Interval between liveness polls in the maintenance loop
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long workers get to exit after SIGTERM before they are killed
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Parse a raw worker count value.
///
/// `None` and blank strings mean "not configured" and yield
/// [`DEFAULT_WORKERS`].
///
/// # Errors
///
/// Returns [`CoreError::ConfigurationError`] if the value is present but not a
/// positive integer.
pub fn parse_worker_count(raw: Option<&str>) -> Result<usize> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_WORKERS);
    };

    match raw.parse::<usize>() {
        Ok(0) => Err(CoreError::ConfigurationError(format!(
            "{WORKERS_ENV}: worker count must be at least 1, got 0"
        ))),
        Ok(n) => Ok(n),
        Err(e) => Err(CoreError::ConfigurationError(format!(
            "{WORKERS_ENV}: '{raw}' is not a positive integer: {e}"
        ))),
    }
}

/// Read the worker count from [`WORKERS_ENV`]
///
/// # Errors
///
/// Fails if the variable is set to something other than a positive integer,
/// or is not valid unicode.
pub fn worker_count_from_env() -> Result<usize> {
    match env::var(WORKERS_ENV) {
        Ok(value) => parse_worker_count(Some(&value)),
        Err(VarError::NotPresent) => parse_worker_count(None),
        Err(VarError::NotUnicode(value)) => Err(CoreError::ConfigurationError(format!(
            "{WORKERS_ENV}: {value:?} is not valid unicode"
        ))),
    }
}

/// Runtime settings for a supervisor run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Target number of live workers
    pub workers: usize,
    /// Delay between maintenance iterations
    pub poll_interval: Duration,
    /// Time allowed for workers to exit after SIGTERM
    pub grace_period: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

impl PoolSettings {
    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero worker count or a zero poll
    /// interval.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(CoreError::ConfigurationError(
                "worker count must be at least 1".to_string(),
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(CoreError::ConfigurationError(
                "poll interval must be greater than 0".to_string(),
            ));
        }

        debug!("Pool settings validated: {:?}", self);
        Ok(())
    }
}
