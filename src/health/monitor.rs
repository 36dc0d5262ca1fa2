//! Periodic liveness monitoring.
//!
//! # Responsibilities
//! - Probe the checker once per interval
//! - Report every outcome (success or failure) to the reporter
//! - Exit promptly once shutdown is signalled
//!
//! # Design Decisions
//! - The probe runs inside the loop body, so ticks never overlap; a slow
//!   probe delays the next tick instead of starting a second one
//! - Missed ticks are not replayed in a burst after a slow probe
//! - A failed probe is only reported; the next tick is the retry
//! - `run` consumes the monitor, so a stopped monitor cannot be restarted

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::health::checker::{CheckTarget, HealthChecker};
use crate::health::probe::{LogReporter, ProbeReporter, ProbeResult};

pub struct HealthMonitor {
    checker: Arc<dyn HealthChecker>,
    reporter: Arc<dyn ProbeReporter>,
    target: CheckTarget,
    interval: Duration,
    probe_timeout: Duration,
}

impl HealthMonitor {
    pub fn new(
        checker: Arc<dyn HealthChecker>,
        target: CheckTarget,
        interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            checker,
            reporter: Arc::new(LogReporter),
            target,
            interval,
            probe_timeout,
        }
    }

    /// Replace the default log/metrics reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProbeReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Run until `shutdown` fires (or its sender is dropped).
    ///
    /// A probe already in flight when shutdown arrives is allowed to finish
    /// or time out; no probe starts after that.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = ?self.interval,
            probe_timeout = ?self.probe_timeout,
            check_type = self.target.check_type,
            "Health monitor started"
        );

        // The first probe is one full interval after start.
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::debug!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    let result = self.check().await;
                    self.reporter.report(&self.target, &result);
                }
            }
        }

        self.reporter.stopped(&self.target);
    }

    /// One probe, timed.
    pub async fn check(&self) -> ProbeResult {
        let start = Instant::now();
        let outcome = self.checker.health_check(self.probe_timeout).await;
        let elapsed = start.elapsed();

        ProbeResult {
            elapsed,
            error: outcome.err(),
            pool: self.checker.pool_status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HealthChecker for Flaky {
        async fn health_check(&self, _timeout: Duration) -> AppResult<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 0 {
                Ok(())
            } else {
                Err(AppError::HealthCheckFailed {
                    source: "connection reset".into(),
                })
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_measures_and_captures_error() {
        let checker = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
        });
        let monitor = HealthMonitor::new(
            checker,
            CheckTarget::database("db.internal", "orders"),
            Duration::from_secs(5),
            Duration::from_secs(3),
        );

        let first = monitor.check().await;
        assert!(first.success());
        assert!(first.pool.is_none());

        let second = monitor.check().await;
        assert!(!second.success());
        assert_eq!(
            second.error.as_ref().map(AppError::code),
            Some("DB_HEALTH_CHECK_FAILED")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_probe_before_first_interval() {
        let checker = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
        });
        let (tx, rx) = broadcast::channel(1);
        let monitor = HealthMonitor::new(
            checker.clone(),
            CheckTarget::database("db.internal", "orders"),
            Duration::from_secs(5),
            Duration::from_secs(3),
        );
        let handle = tokio::spawn(monitor.run(rx));

        time::sleep(Duration::from_secs(4)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(checker.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_stops_monitor() {
        let checker = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
        });
        let (tx, rx) = broadcast::channel::<()>(1);
        let monitor = HealthMonitor::new(
            checker,
            CheckTarget::database("db.internal", "orders"),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let handle = tokio::spawn(monitor.run(rx));

        drop(tx);
        handle.await.unwrap();
    }
}
