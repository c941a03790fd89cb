//! OS signal handling shared by the supervisor and its workers.
//!
//! [`ShutdownSignals::install`] registers the handlers up front, so a signal
//! arriving between installation and the first [`ShutdownSignals::recv`] is not
//! lost and never falls through to the default (abrupt) action.
//!
//! ## Unix
//! - **SIGINT** (Ctrl-C in terminal)
//! - **SIGTERM** (what the supervisor sends its workers)
//! - **SIGQUIT**
//!
//! ## Other platforms
//! Only Ctrl-C is observed.

use std::io;

/// Registered shutdown signal listeners
#[derive(Debug)]
pub struct ShutdownSignals {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigquit: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    /// Register the handlers. Must be called from within a tokio runtime.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    /// Register the handlers. Must be called from within a tokio runtime.
    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next shutdown signal and return its name
    #[cfg(unix)]
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigint.recv() => "SIGINT",
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigquit.recv() => "SIGQUIT",
        }
    }

    /// Wait for the next shutdown signal and return its name
    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "CTRL_C",
            Err(_) => std::future::pending().await,
        }
    }
}
