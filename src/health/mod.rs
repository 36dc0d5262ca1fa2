//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! monitor.rs:
//!     Periodic timer
//!     → HealthChecker::health_check (checker.rs), bounded by probe timeout
//!     → ProbeResult (probe.rs)
//!     → ProbeReporter: structured log event + metrics
//! ```
//!
//! # Design Decisions
//! - The monitor depends on the `HealthChecker` capability only
//! - Probes from one monitor are strictly sequential
//! - Periodic failures are logged, never fatal

pub mod checker;
pub mod monitor;
pub mod probe;

pub use checker::{CheckTarget, HealthChecker};
pub use monitor::HealthMonitor;
pub use probe::{LogReporter, ProbeReporter, ProbeResult};
