//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cdc_agent_health_checks_total` (counter): probes by check type and result
//! - `cdc_agent_health_check_duration_seconds` (histogram): probe latency
//! - `cdc_agent_backend_up` (gauge): 1=last probe passed, 0=failed
//! - `cdc_agent_pool_connections` (gauge): open pool connections
//! - `cdc_agent_pool_idle_connections` (gauge): idle pool connections
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - The Prometheus listener is optional and never fatal

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::database::driver::PoolStatus;

/// Install the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one probe.
pub fn record_probe(check_type: &'static str, success: bool, elapsed: Duration) {
    let result = if success { "success" } else { "failure" };

    counter!("cdc_agent_health_checks_total", "check_type" => check_type, "result" => result)
        .increment(1);
    histogram!("cdc_agent_health_check_duration_seconds", "check_type" => check_type)
        .record(elapsed.as_secs_f64());
    gauge!("cdc_agent_backend_up", "check_type" => check_type)
        .set(if success { 1.0 } else { 0.0 });
}

/// Record pool occupancy.
pub fn record_pool_status(check_type: &'static str, status: &PoolStatus) {
    gauge!("cdc_agent_pool_connections", "check_type" => check_type).set(status.size as f64);
    gauge!("cdc_agent_pool_idle_connections", "check_type" => check_type).set(status.idle as f64);
}
