//! Verified connection pool ownership.
//!
//! # Lifecycle
//! ```text
//! init(): validate settings → open pool → first probe ─┐
//!                                                      ▼
//!                  health_check() ... health_check()  (serving)
//!                                                      │
//!                                  close() ────────────▶ closed
//! ```
//!
//! `init` never hands back a manager whose first probe failed, and
//! `close` may be called any number of times.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time;

use crate::database::driver::{driver_for, ConnectionPool, PoolDriver, PoolStatus};
use crate::database::settings::{ConnectionSettings, Technology};
use crate::error::{AppError, AppResult};
use crate::health::checker::{CheckTarget, HealthChecker};

/// Owns one pooled connection handle and the settings it was built from.
pub struct ConnectionManager {
    pool: Box<dyn ConnectionPool>,
    settings: ConnectionSettings,
    closed: AtomicBool,
}

impl ConnectionManager {
    /// Validate `settings`, open a pool with the driver registered for
    /// its technology and verify it with one bounded probe.
    pub async fn init(settings: ConnectionSettings) -> AppResult<Self> {
        let technology = validate(&settings)?;
        let driver = driver_for(technology);
        Self::open_verified(settings, driver.as_ref()).await
    }

    /// Same as [`ConnectionManager::init`] with an explicit driver.
    ///
    /// Validation still runs first; `driver` is only touched once the
    /// settings are complete and the technology tag is recognized.
    pub async fn init_with_driver(
        settings: ConnectionSettings,
        driver: &dyn PoolDriver,
    ) -> AppResult<Self> {
        validate(&settings)?;
        Self::open_verified(settings, driver).await
    }

    async fn open_verified(settings: ConnectionSettings, driver: &dyn PoolDriver) -> AppResult<Self> {
        tracing::info!(
            technology = %settings.technology,
            connection = %settings.connection_string(false),
            "Opening connection pool"
        );

        let pool = driver.open(&settings).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to open connection pool");
            AppError::init_failed(e)
        })?;

        let manager = Self {
            pool,
            settings,
            closed: AtomicBool::new(false),
        };

        tracing::info!("Pinging database to verify connection");
        if let Err(e) = manager.probe(manager.settings.probe_timeout).await {
            manager.close();
            let e = match e {
                AppError::HealthCheckFailed { source } => AppError::InitFailed { source },
                other => other,
            };
            tracing::error!(
                code = e.code(),
                cause = %e.cause().unwrap_or_default(),
                "Database connection could not be verified"
            );
            return Err(e);
        }

        tracing::info!(
            host = %manager.settings.host,
            database = %manager.settings.database,
            "Database initialized successfully"
        );
        Ok(manager)
    }

    /// Issue one liveness round trip, bounded by `timeout`.
    ///
    /// Dropping the returned future (caller cancellation) abandons the probe
    /// and releases the checked-out connection.
    pub async fn health_check(&self, timeout: Duration) -> AppResult<()> {
        let result = self.probe(timeout).await;
        if let Err(e) = &result {
            tracing::error!(
                code = e.code(),
                cause = %e.cause().unwrap_or_default(),
                "Database health check failed"
            );
        }
        result
    }

    async fn probe(&self, timeout: Duration) -> AppResult<()> {
        match time::timeout(timeout, self.pool.ping()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(AppError::health_check_failed(e)),
            Err(elapsed) => Err(AppError::health_check_failed(elapsed)),
        }
    }

    /// Release the pool. Later calls are no-ops.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Connection pool already closed");
            return;
        }
        self.pool.close();
        tracing::info!("Connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Identity reported with every health diagnostic.
    pub fn target(&self) -> CheckTarget {
        CheckTarget::database(&self.settings.host, &self.settings.database)
    }
}

fn validate(settings: &ConnectionSettings) -> AppResult<Technology> {
    tracing::info!("Checking database configuration");
    if let Err(e) = settings.ensure_complete() {
        tracing::error!(code = e.code(), error = %e, "Database configuration is incomplete");
        return Err(e);
    }

    match settings.technology() {
        Ok(technology) => {
            tracing::info!(technology = %technology, "Database technology");
            Ok(technology)
        }
        Err(e) => {
            tracing::error!(code = e.code(), technology = %settings.technology, "Unsupported database technology");
            Err(e)
        }
    }
}

#[async_trait]
impl HealthChecker for ConnectionManager {
    async fn health_check(&self, timeout: Duration) -> AppResult<()> {
        ConnectionManager::health_check(self, timeout).await
    }

    fn pool_status(&self) -> Option<PoolStatus> {
        Some(ConnectionManager::pool_status(self))
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}
