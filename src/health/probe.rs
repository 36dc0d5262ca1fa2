//! Probe outcomes and where they are reported.

use std::time::Duration;

use crate::database::driver::PoolStatus;
use crate::error::AppError;
use crate::health::checker::CheckTarget;
use crate::observability::metrics;

/// Outcome of a single tick. Reported once, then dropped.
#[derive(Debug)]
pub struct ProbeResult {
    pub elapsed: Duration,
    pub error: Option<AppError>,
    pub pool: Option<PoolStatus>,
}

impl ProbeResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Receives every probe outcome and the monitor's stop notice.
pub trait ProbeReporter: Send + Sync {
    fn report(&self, target: &CheckTarget, result: &ProbeResult);

    fn stopped(&self, _target: &CheckTarget) {}
}

/// Default reporter: one structured log event plus metrics per probe.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ProbeReporter for LogReporter {
    fn report(&self, target: &CheckTarget, result: &ProbeResult) {
        let duration_seconds = result.elapsed.as_secs_f64();
        let duration_ms = result.elapsed.as_millis() as u64;

        match &result.error {
            None => tracing::info!(
                check_type = target.check_type,
                db_host = %target.host,
                db_name = %target.database,
                duration_seconds,
                duration_ms,
                success = true,
                "Health check completed"
            ),
            Some(e) => tracing::error!(
                check_type = target.check_type,
                db_host = %target.host,
                db_name = %target.database,
                duration_seconds,
                duration_ms,
                success = false,
                code = e.code(),
                error = %e,
                "Health check completed"
            ),
        }

        metrics::record_probe(target.check_type, result.success(), result.elapsed);
        if let Some(pool) = result.pool {
            metrics::record_pool_status(target.check_type, &pool);
        }
    }

    fn stopped(&self, target: &CheckTarget) {
        tracing::info!(check_type = target.check_type, "Health monitor stopped");
    }
}
