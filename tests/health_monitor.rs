//! Scheduling behaviour of the health monitor under virtual time.

use std::sync::Arc;
use std::time::Duration;

use cdc_agent::health::{CheckTarget, HealthMonitor};
use cdc_agent::lifecycle::Shutdown;

mod common;
use common::{CountingChecker, RecordingReporter};

fn monitor(checker: Arc<CountingChecker>, reporter: Arc<RecordingReporter>, interval: u64) -> HealthMonitor {
    HealthMonitor::new(
        checker,
        CheckTarget::database("db.internal", "orders"),
        Duration::from_secs(interval),
        Duration::from_secs(3),
    )
    .with_reporter(reporter)
}

#[tokio::test(start_paused = true)]
async fn test_probes_once_per_interval() {
    let checker = Arc::new(CountingChecker::new());
    let reporter = Arc::new(RecordingReporter::default());
    let shutdown = Shutdown::new();

    let handle = tokio::spawn(monitor(checker.clone(), reporter.clone(), 5).run(shutdown.subscribe()));
    tokio::time::sleep(Duration::from_secs(22)).await;

    shutdown.trigger();
    handle.await.unwrap();

    let calls = checker.calls();
    assert!((4..=5).contains(&calls), "expected 4-5 probes, got {calls}");
    assert_eq!(checker.max_in_flight(), 1);
    assert_eq!(reporter.outcomes().len(), calls);
    assert!(reporter.outcomes().iter().all(|(ok, _)| *ok));
}

#[tokio::test(start_paused = true)]
async fn test_slow_probe_never_overlaps() {
    let checker = Arc::new(CountingChecker::slow(Duration::from_secs(15)));
    let reporter = Arc::new(RecordingReporter::default());
    let shutdown = Shutdown::new();

    let handle = tokio::spawn(monitor(checker.clone(), reporter.clone(), 5).run(shutdown.subscribe()));
    tokio::time::sleep(Duration::from_secs(60)).await;

    shutdown.trigger();
    handle.await.unwrap();

    assert_eq!(checker.max_in_flight(), 1);
    assert!(checker.calls() >= 1);
    assert!(checker.calls() < 12, "ticks piled up: {}", checker.calls());
}

#[tokio::test(start_paused = true)]
async fn test_failures_are_reported_and_retried() {
    let checker = Arc::new(CountingChecker::failing());
    let reporter = Arc::new(RecordingReporter::default());
    let shutdown = Shutdown::new();

    let handle = tokio::spawn(monitor(checker.clone(), reporter.clone(), 5).run(shutdown.subscribe()));

    // Two failed ticks at 5s and 10s.
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(
        reporter.outcomes(),
        vec![
            (false, Some("DB_HEALTH_CHECK_FAILED")),
            (false, Some("DB_HEALTH_CHECK_FAILED")),
        ]
    );

    // The store comes back; the next tick reports success.
    checker.set_failing(false);
    tokio::time::sleep(Duration::from_secs(5)).await;

    shutdown.trigger();
    handle.await.unwrap();

    let outcomes = reporter.outcomes();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[2], (true, None));
}

#[tokio::test(start_paused = true)]
async fn test_no_probe_after_shutdown() {
    let checker = Arc::new(CountingChecker::new());
    let reporter = Arc::new(RecordingReporter::default());
    let shutdown = Shutdown::new();

    let handle = tokio::spawn(monitor(checker.clone(), reporter.clone(), 1).run(shutdown.subscribe()));
    tokio::time::sleep(Duration::from_millis(3500)).await;

    shutdown.trigger();
    handle.await.unwrap();
    assert!(reporter.is_stopped());
    assert!(shutdown.is_triggered());

    let calls = checker.calls();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(checker.calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_in_flight_probe() {
    let checker = Arc::new(CountingChecker::slow(Duration::from_secs(2)));
    let reporter = Arc::new(RecordingReporter::default());
    let shutdown = Shutdown::new();

    let handle = tokio::spawn(monitor(checker.clone(), reporter.clone(), 5).run(shutdown.subscribe()));

    // The first probe starts at 5s and is still running at 6s.
    tokio::time::sleep(Duration::from_secs(6)).await;
    shutdown.trigger();
    handle.await.unwrap();

    assert_eq!(checker.calls(), 1);
    assert_eq!(reporter.outcomes(), vec![(true, None)]);
    assert!(reporter.is_stopped());
}
