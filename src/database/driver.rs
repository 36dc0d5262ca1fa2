//! Storage driver seam.
//!
//! A driver turns [`ConnectionSettings`] into an open [`ConnectionPool`].
//! The pool is expected to be internally synchronized; the connection
//! manager never adds locking of its own.

use async_trait::async_trait;

use crate::database::settings::{ConnectionSettings, Technology};
use crate::database::sqlserver::SqlServerDriver;
use crate::error::BoxError;

/// Point-in-time view of pool occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatus {
    /// Configured upper bound on open connections.
    pub max_size: usize,
    /// Connections currently open (idle + in use).
    pub size: usize,
    /// Connections sitting idle in the pool.
    pub idle: usize,
}

/// An open, shareable connection pool.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// One round trip to the store over a pooled connection.
    async fn ping(&self) -> Result<(), BoxError>;

    /// Stop handing out connections and drop idle ones.
    fn close(&self);

    fn status(&self) -> PoolStatus;
}

/// Opens pools for one backing-store technology.
#[async_trait]
pub trait PoolDriver: Send + Sync {
    /// Build a pool with the sizing/lifetime policy of `settings` applied.
    ///
    /// Implementations must not verify liveness here; the caller probes
    /// the pool immediately afterwards.
    async fn open(&self, settings: &ConnectionSettings) -> Result<Box<dyn ConnectionPool>, BoxError>;
}

/// The driver registered for `technology`.
pub fn driver_for(technology: Technology) -> Box<dyn PoolDriver> {
    match technology {
        Technology::SqlServer => Box::new(SqlServerDriver),
    }
}
