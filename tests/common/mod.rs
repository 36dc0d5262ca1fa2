//! Shared doubles for integration testing.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use cdc_agent::config::{DatabaseConfig, Secret};
use cdc_agent::database::{ConnectionPool, ConnectionSettings, PoolDriver, PoolStatus};
use cdc_agent::error::{AppError, AppResult, BoxError};
use cdc_agent::health::{CheckTarget, HealthChecker, ProbeReporter, ProbeResult};

/// Complete, valid settings for a SQL Server target.
pub fn settings() -> ConnectionSettings {
    ConnectionSettings::from(&DatabaseConfig {
        technology: "sqlserver".into(),
        host: "db.internal".into(),
        port: "1433".into(),
        user: "cdc".into(),
        password: Secret::new("secretValue"),
        name: "orders".into(),
        ..DatabaseConfig::default()
    })
}

/// Checker that counts calls, tracks overlap and can be made slow or failing.
#[derive(Default)]
pub struct CountingChecker {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
    failing: AtomicBool,
}

impl CountingChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each probe takes `delay` of (virtual) time.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        let checker = Self::default();
        checker.set_failing(true);
        checker
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthChecker for CountingChecker {
    async fn health_check(&self, _timeout: Duration) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(AppError::HealthCheckFailed {
                source: "connection refused".into(),
            })
        } else {
            Ok(())
        }
    }
}

/// One entry per reported probe: `(success, error code)`.
#[derive(Default)]
pub struct RecordingReporter {
    pub reports: Mutex<Vec<(bool, Option<&'static str>)>>,
    pub stopped: AtomicBool,
}

impl RecordingReporter {
    pub fn outcomes(&self) -> Vec<(bool, Option<&'static str>)> {
        self.reports.lock().unwrap().clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl ProbeReporter for RecordingReporter {
    fn report(&self, _target: &CheckTarget, result: &ProbeResult) {
        let code = result.error.as_ref().map(AppError::code);
        self.reports.lock().unwrap().push((result.success(), code));
    }

    fn stopped(&self, _target: &CheckTarget) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Call counters shared between a [`MockDriver`] and the pools it opens.
#[derive(Default)]
pub struct DriverCalls {
    pub opens: AtomicUsize,
    pub pings: AtomicUsize,
    pub closes: AtomicUsize,
}

impl DriverCalls {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Driver whose pools answer pings according to a shared switch.
pub struct MockDriver {
    pub calls: Arc<DriverCalls>,
    pub healthy: Arc<AtomicBool>,
    pub ping_delay: Option<Duration>,
}

impl MockDriver {
    pub fn healthy() -> Self {
        Self {
            calls: Arc::default(),
            healthy: Arc::new(AtomicBool::new(true)),
            ping_delay: None,
        }
    }

    pub fn unhealthy() -> Self {
        let driver = Self::healthy();
        driver.healthy.store(false, Ordering::SeqCst);
        driver
    }
}

#[async_trait]
impl PoolDriver for MockDriver {
    async fn open(&self, settings: &ConnectionSettings) -> Result<Box<dyn ConnectionPool>, BoxError> {
        self.calls.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPool {
            calls: self.calls.clone(),
            healthy: self.healthy.clone(),
            ping_delay: self.ping_delay,
            max_size: settings.max_open_conns,
        }))
    }
}

pub struct MockPool {
    calls: Arc<DriverCalls>,
    healthy: Arc<AtomicBool>,
    ping_delay: Option<Duration>,
    max_size: usize,
}

#[async_trait]
impl ConnectionPool for MockPool {
    async fn ping(&self) -> Result<(), BoxError> {
        self.calls.pings.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.ping_delay {
            tokio::time::sleep(delay).await;
        }
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err("login failed for user 'cdc'".into())
        }
    }

    fn close(&self) {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn status(&self) -> PoolStatus {
        PoolStatus {
            max_size: self.max_size,
            size: 1,
            idle: 1,
        }
    }
}
