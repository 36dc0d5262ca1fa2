//! CDC Agent Library
//!
//! Verified database connection pool plus a periodic liveness monitor.

pub mod config;
pub mod database;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod runtime;

pub use config::schema::AppConfig;
pub use database::{ConnectionManager, ConnectionSettings};
pub use error::{AppError, AppResult};
pub use health::{HealthChecker, HealthMonitor};
pub use lifecycle::Shutdown;
