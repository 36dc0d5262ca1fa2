//! Database connection subsystem.
//!
//! # Data Flow
//! ```text
//! DatabaseConfig
//!     → settings.rs (ConnectionSettings snapshot, connection string)
//!     → manager.rs (validate → driver.open → first probe)
//!     → driver.rs (technology → PoolDriver)
//!     → sqlserver.rs (tiberius clients pooled by deadpool)
//! ```
//!
//! # Design Decisions
//! - One explicitly constructed manager per process, owned by `main`
//! - Validation happens before any I/O
//! - Driver errors are always wrapped (`InitFailed`, `HealthCheckFailed`)
//! - The pool is internally synchronized; the manager adds no locks

pub mod driver;
pub mod manager;
pub mod settings;
pub mod sqlserver;

pub use driver::{ConnectionPool, PoolDriver, PoolStatus};
pub use manager::ConnectionManager;
pub use settings::{ConnectionSettings, Technology};
