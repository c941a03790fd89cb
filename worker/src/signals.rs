//! Turns termination signals into a shutdown request

use crate::error::Result;
use crate::shutdown::ShutdownTrigger;
use respawn_core::ShutdownSignals;
use tokio::task::JoinHandle;
use tracing::info;

/// Install handlers for SIGTERM (and SIGINT, SIGQUIT) that fire `trigger`
///
/// The handlers are registered before this returns, so a signal delivered
/// afterwards is never handled by the default action. The returned task ends
/// after the first signal.
pub fn install_termination_handler(trigger: ShutdownTrigger) -> Result<JoinHandle<()>> {
    let mut signals = ShutdownSignals::install()?;

    Ok(tokio::spawn(async move {
        let name = signals.recv().await;
        info!("Received signal {}", name);
        trigger.trigger();
    }))
}
