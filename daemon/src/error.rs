//! Binary-level error type

use respawn_core::CoreError;
use worker::WorkerError;

/// Anything that ends the `respawn` binary unsuccessfully
#[derive(Debug)]
pub enum DaemonError {
    /// Supervisor side failure
    Core(CoreError),
    /// Worker side failure
    Worker(WorkerError),
}

impl DaemonError {
    /// Process exit code for this error
    ///
    /// Configuration errors exit with 2, a fatal task with the code it chose,
    /// anything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            DaemonError::Core(err) if err.is_configuration() => 2,
            DaemonError::Core(_) => 1,
            DaemonError::Worker(err) => err.exit_code(),
        }
    }
}

impl std::fmt::Display for DaemonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DaemonError::Core(err) => write!(f, "[{}] {}", err.code(), err),
            DaemonError::Worker(err) => write!(f, "[{}] {}", err.code(), err),
        }
    }
}

impl std::error::Error for DaemonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DaemonError::Core(err) => Some(err),
            DaemonError::Worker(err) => Some(err),
        }
    }
}

impl From<CoreError> for DaemonError {
    fn from(err: CoreError) -> Self {
        DaemonError::Core(err)
    }
}

impl From<WorkerError> for DaemonError {
    fn from(err: WorkerError) -> Self {
        DaemonError::Worker(err)
    }
}

/// Binary result type
pub type Result<T> = std::result::Result<T, DaemonError>;
