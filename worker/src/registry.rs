//! Weighted task registry
//!
//! Tasks are registered once, at worker startup, into a
//! [`TaskRegistryBuilder`]. [`TaskRegistryBuilder::build`] freezes them into a
//! [`TaskRegistry`] which only supports weighted selection.

use crate::error::{Result, TaskError, WorkerError};
use crate::shutdown::Shutdown;
use async_trait::async_trait;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// What a running task can see of its worker
#[derive(Debug, Clone)]
pub struct TaskContext {
    shutdown: Shutdown,
}

impl TaskContext {
    /// Create a context tied to the worker's shutdown token
    pub fn new(shutdown: Shutdown) -> Self {
        Self { shutdown }
    }

    /// Whether the worker has been asked to stop
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.is_requested()
    }

    /// Sleep, waking early if the worker is asked to stop
    ///
    /// Returns `true` if the full duration elapsed.
    pub async fn sleep(&self, duration: Duration) -> bool {
        self.shutdown.sleep(duration).await
    }
}

/// A unit of simulated work
#[async_trait]
pub trait Task: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Run the task once
    async fn run(&self, ctx: &TaskContext) -> std::result::Result<(), TaskError>;
}

#[derive(Clone)]
struct Registered {
    task: Arc<dyn Task>,
    weight: f64,
}

/// Collects tasks before the worker loop starts
#[derive(Default)]
pub struct TaskRegistryBuilder {
    tasks: Vec<Registered>,
}

impl TaskRegistryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `task` with a relative `weight`
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Configuration`] unless `weight` is finite and
    /// strictly positive.
    pub fn register<T>(&mut self, task: T, weight: f64) -> Result<&mut Self>
    where
        T: Task + 'static,
    {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(WorkerError::Configuration(format!(
                "task '{}': weight must be a positive number, got {}",
                task.name(),
                weight
            )));
        }

        debug!("Registered task {} with weight {}", task.name(), weight);
        self.tasks.push(Registered {
            task: Arc::new(task),
            weight,
        });
        Ok(self)
    }

    /// Freeze the registry
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Configuration`] if no task was registered.
    pub fn build(self) -> Result<TaskRegistry> {
        let weights = self.tasks.iter().map(|r| r.weight);
        let index = WeightedIndex::new(weights).map_err(|e| {
            WorkerError::Configuration(format!("cannot build task registry: {e}"))
        })?;

        Ok(TaskRegistry {
            tasks: self.tasks,
            index,
        })
    }
}

/// Immutable, weighted set of tasks
pub struct TaskRegistry {
    tasks: Vec<Registered>,
    index: WeightedIndex<f64>,
}

impl TaskRegistry {
    /// Start registering tasks
    pub fn builder() -> TaskRegistryBuilder {
        TaskRegistryBuilder::new()
    }

    /// Number of registered tasks (never zero)
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Always false: an empty registry cannot be built
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(|r| r.task.name()).collect()
    }

    /// Task weights in registration order
    pub fn weights(&self) -> Vec<f64> {
        self.tasks.iter().map(|r| r.weight).collect()
    }

    /// Pick a task with probability `weight / total_weight`
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> &Arc<dyn Task> {
        &self.tasks[self.index.sample(rng)].task
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.tasks.iter().map(|r| (r.task.name(), r.weight)))
            .finish()
    }
}
