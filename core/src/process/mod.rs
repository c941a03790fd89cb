//! Process management utilities for respawn
//!
//! Workers are spawned into their own process group so that a terminal
//! interrupt reaches only the supervisor, which then decides how and when to
//! signal each worker.

#[cfg(unix)]
pub mod unix;

#[cfg(unix)]
pub use unix::*;
