//! Built-in simulated tasks

use crate::error::{Result, TaskError};
use crate::registry::{Task, TaskContext, TaskRegistry};
use async_trait::async_trait;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::{debug, info};

/// Sleeps a random whole number of seconds, waking early on shutdown
#[derive(Debug, Clone)]
pub struct LongWait {
    seconds: RangeInclusive<u64>,
}

impl LongWait {
    /// Wait between 1 and 10 seconds
    pub fn new() -> Self {
        Self::with_range(1..=10)
    }

    /// Wait a number of seconds drawn from `seconds`
    pub fn with_range(seconds: RangeInclusive<u64>) -> Self {
        Self { seconds }
    }
}

impl Default for LongWait {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Task for LongWait {
    fn name(&self) -> &str {
        "long_wait"
    }

    async fn run(&self, ctx: &TaskContext) -> std::result::Result<(), TaskError> {
        let seconds = rand::thread_rng().gen_range(self.seconds.clone());
        info!("Waiting {} seconds", seconds);

        if !ctx.sleep(Duration::from_secs(seconds)).await {
            debug!("Wait interrupted by shutdown");
        }
        Ok(())
    }
}

/// Always fails in a way the loop is expected to survive
#[derive(Debug, Clone, Default)]
pub struct KnownFailure;

#[async_trait]
impl Task for KnownFailure {
    fn name(&self) -> &str {
        "raise_known_error"
    }

    async fn run(&self, _ctx: &TaskContext) -> std::result::Result<(), TaskError> {
        Err(TaskError::Recoverable("Fake unexpected error".to_string()))
    }
}

/// Always fails in a way that ends the worker process
#[derive(Debug, Clone)]
pub struct UnexpectedExit {
    code: i32,
}

impl UnexpectedExit {
    /// Fail with process exit code `code`
    pub fn new(code: i32) -> Self {
        Self { code }
    }
}

impl Default for UnexpectedExit {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl Task for UnexpectedExit {
    fn name(&self) -> &str {
        "raise_unexpected_error"
    }

    async fn run(&self, _ctx: &TaskContext) -> std::result::Result<(), TaskError> {
        Err(TaskError::Fatal {
            code: self.code,
            reason: "Fake system error".to_string(),
        })
    }
}

/// The registry every worker process runs: long waits are common, known
/// failures occasional and fatal ones rare
pub fn default_registry() -> Result<TaskRegistry> {
    let mut builder = TaskRegistry::builder();
    builder
        .register(LongWait::new(), 10.0)?
        .register(KnownFailure, 3.0)?
        .register(UnexpectedExit::default(), 1.0)?;
    builder.build()
}
