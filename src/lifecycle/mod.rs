//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Init logger → Init verified pool → Spawn health monitor
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Cancel monitor → Await monitor exit → Close pool → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: a pool that cannot be verified at startup is fatal
//! - Ordered shutdown: the monitor has stopped before the pool closes
//! - Short grace delay before exit so final diagnostics are flushed

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
