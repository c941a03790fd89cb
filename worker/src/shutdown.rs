//! Cancellation token for the worker loop

use std::time::Duration;
use tokio::sync::watch;

/// Read side: checked at loop boundaries and awaited during pauses
#[derive(Debug, Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

/// Write side: flips every [`Shutdown`] cloned from the same pair
#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a connected trigger/token pair
    pub fn new() -> (ShutdownTrigger, Self) {
        let (sender, receiver) = watch::channel(false);
        (ShutdownTrigger { sender }, Self { receiver })
    }

    /// Whether shutdown has been requested
    pub fn is_requested(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once shutdown is requested
    ///
    /// If the trigger is dropped without firing, this never resolves.
    pub async fn requested(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|requested| *requested).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Sleep for `duration` unless shutdown is requested first
    ///
    /// Returns `true` if the full duration elapsed.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            () = tokio::time::sleep(duration) => true,
            () = self.requested() => false,
        }
    }
}

impl ShutdownTrigger {
    /// Request shutdown
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}
