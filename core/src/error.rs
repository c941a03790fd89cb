//! Core error types and utilities

use thiserror::Error;

/// Core-specific error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Precondition error: {0}")]
    PreconditionError(String),

    #[error("Initialization error: {0}")]
    InitializationError(String),

    #[error("Process spawn error: {0}")]
    ProcessSpawn(String),

    #[error("Process signal error: {0}")]
    ProcessSignal(String),

    #[error("Process wait error: {0}")]
    ProcessWait(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CoreError {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::ConfigurationError(_) => "CORE001",
            CoreError::PreconditionError(_) => "CORE002",
            CoreError::InitializationError(_) => "CORE003",
            CoreError::ProcessSpawn(_) => "CORE004",
            CoreError::ProcessSignal(_) => "CORE005",
            CoreError::ProcessWait(_) => "CORE006",
            CoreError::IoError(_) => "CORE007",
        }
    }

    /// Whether this error was caused by bad startup configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, CoreError::ConfigurationError(_))
    }
}

/// Core-specific result type
pub type Result<T> = std::result::Result<T, CoreError>;
