//! Worker pool supervision
//!
//! This module keeps a fixed number of worker processes alive, replacing any
//! that exit, and tears the pool down when the run is interrupted.
//!
//! ## Components
//!
//! - [`ProcessPool`]: slot arena of workers with start/poll/maintain/stop
//! - [`PoolScope`]: started pool; stops every live worker when dropped
//! - [`supervise`]: scoped run driver with interrupt handling and grace period
//! - [`ProcessAdapter`]: trait for abstracting process management
//!
//! ## Lifecycle
//!
//! ```text
//! start → maintain (poll, restart dead, sleep) … interrupt → stop → grace → kill stragglers
//! ```

pub mod adapters;
pub mod pool;
pub mod run;

pub use adapters::*;
pub use pool::*;
pub use run::*;
