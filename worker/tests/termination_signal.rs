//! SIGTERM ends the worker loop cleanly
//!
//! Kept in its own test binary: the signal is raised at this process.

#![cfg(unix)]

use async_trait::async_trait;
use nix::sys::signal::{raise, Signal};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use worker::{
    install_termination_handler, run_loop, Shutdown, Task, TaskContext, TaskError, TaskRegistry,
    WorkerConfig,
};

struct Tick(Arc<AtomicU64>);

#[async_trait]
impl Task for Tick {
    fn name(&self) -> &str {
        "tick"
    }

    async fn run(&self, _ctx: &TaskContext) -> Result<(), TaskError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn sigterm_stops_the_loop_between_tasks() {
    let ticks = Arc::new(AtomicU64::new(0));
    let mut builder = TaskRegistry::builder();
    builder.register(Tick(ticks.clone()), 1.0).unwrap();
    let registry = builder.build().unwrap();

    let (trigger, shutdown) = Shutdown::new();
    let handler = install_termination_handler(trigger).unwrap();

    let config = WorkerConfig {
        pause: Duration::from_millis(20),
    };
    let worker = tokio::spawn(async move {
        let mut rng = StdRng::seed_from_u64(3);
        run_loop(&registry, shutdown, config, &mut rng).await
    });

    while ticks.load(Ordering::SeqCst) < 2 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    raise(Signal::SIGTERM).unwrap();

    let stats = tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .expect("worker did not stop after SIGTERM")
        .unwrap()
        .expect("SIGTERM is a clean exit");

    assert!(stats.executed >= 2);
    assert_eq!(stats.recovered, 0);
    handler.await.unwrap();
}
