//! The liveness capability the monitor depends on.

use std::time::Duration;

use async_trait::async_trait;

use crate::database::driver::PoolStatus;
use crate::error::AppResult;

/// Anything that can answer a bounded liveness probe.
///
/// Implemented by [`ConnectionManager`](crate::database::ConnectionManager);
/// other backing-store adapters plug in the same way. The monitor never
/// sees the concrete store.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Probe liveness, giving up after `timeout`.
    async fn health_check(&self, timeout: Duration) -> AppResult<()>;

    /// Pool occupancy to report alongside the probe, if the checker has one.
    fn pool_status(&self) -> Option<PoolStatus> {
        None
    }
}

/// What a probe is aimed at, as reported in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTarget {
    /// Check category (e.g., "database").
    pub check_type: &'static str,
    pub host: String,
    pub database: String,
}

impl CheckTarget {
    pub fn database(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            check_type: "database",
            host: host.into(),
            database: database.into(),
        }
    }
}
