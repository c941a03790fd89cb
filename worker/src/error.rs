//! Worker error types

use thiserror::Error;

/// How a single task run failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Expected failure: logged, and the loop carries on
    #[error("{0}")]
    Recoverable(String),

    /// Unrecoverable failure: ends the worker process with `code`
    #[error("fatal failure (exit code {code}): {reason}")]
    Fatal { code: i32, reason: String },
}

/// Worker-level errors
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Task '{task}' failed fatally: {reason}")]
    Fatal {
        task: String,
        code: i32,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            WorkerError::Configuration(_) => "WORKER001",
            WorkerError::Fatal { .. } => "WORKER002",
            WorkerError::Io(_) => "WORKER003",
        }
    }

    /// Process exit code the worker should terminate with
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkerError::Fatal { code, .. } => *code,
            WorkerError::Configuration(_) => 2,
            WorkerError::Io(_) => 1,
        }
    }
}

/// Worker result type
pub type Result<T> = std::result::Result<T, WorkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(WorkerError::Configuration("w".to_string()).code(), "WORKER001");
        let fatal = WorkerError::Fatal {
            task: "boom".to_string(),
            code: 3,
            reason: "disk gone".to_string(),
        };
        assert_eq!(fatal.code(), "WORKER002");
        assert_eq!(fatal.exit_code(), 3);
        assert_eq!(fatal.to_string(), "Task 'boom' failed fatally: disk gone");
    }

    #[test]
    fn test_task_error_display() {
        assert_eq!(
            TaskError::Recoverable("Fake unexpected error".to_string()).to_string(),
            "Fake unexpected error"
        );
        let fatal = TaskError::Fatal {
            code: 1,
            reason: "system error".to_string(),
        };
        assert_eq!(fatal.to_string(), "fatal failure (exit code 1): system error");
    }
}
