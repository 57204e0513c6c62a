//! Tests for monitored runs

use super::*;
use crate::config::{ConfigOverrides, EnvSnapshot, LogLevel};
use crate::monitoring::notifications::DeliveryStatus;
use crate::storage::UploadOutcome;
use crate::utils::error::ToolboxError;
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Debug)]
struct RowError {
    row: usize,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bad row {}", self.row)
    }
}

fn overrides(log_dir: &Path) -> ConfigOverrides {
    ConfigOverrides::new()
        .with_app_name("etl_orders")
        .with_owner("owner@example.com")
        .with_log_dir(log_dir)
        .with_log_level(LogLevel::Debug)
        .with_console(false)
}

fn monitor(overrides: ConfigOverrides) -> Monitor {
    Monitor::new(overrides).with_env(EnvSnapshot::empty())
}

fn only_log_file(log_dir: &Path) -> PathBuf {
    let mut files: Vec<PathBuf> = std::fs::read_dir(log_dir.join("etl_orders"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1, "{:?}", files);
    files.remove(0)
}

fn read_records(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_success_returns_value_and_finalizes() {
    let dir = TempDir::new().unwrap();

    let (result, report) = monitor(overrides(dir.path()))
        .run_with_report(|log| async move {
            log.info("extracting orders");
            Ok::<_, RowError>(42)
        })
        .await
        .unwrap();

    assert_eq!(result.unwrap(), 42);
    assert_eq!(report.outcome(), Outcome::Success);
    assert!(report.sink_error.is_none());
    assert!(report.dispatch.nothing_attempted());
    assert!(matches!(report.upload, UploadOutcome::NotAttempted { .. }));

    let records = read_records(&report.artifact);
    let messages: Vec<&str> = records
        .iter()
        .map(|record| record["message"].as_str().unwrap())
        .collect();
    assert_eq!(
        messages,
        [
            "Execution started",
            "extracting orders",
            "Execution completed successfully"
        ]
    );
    assert_eq!(records[2]["status"], "SUCCESS");
}

#[tokio::test]
async fn test_error_is_logged_and_returned_unchanged() {
    let dir = TempDir::new().unwrap();

    let (result, report) = monitor(overrides(dir.path()))
        .run_with_report(|_log| async { Err::<(), _>(RowError { row: 17 }) })
        .await
        .unwrap();

    let error = result.unwrap_err();
    assert_eq!(error.row, 17);
    assert_eq!(report.outcome(), Outcome::Failure);

    let captured = report.execution.error.as_ref().unwrap();
    assert!(captured.type_name.ends_with("RowError"));
    assert_eq!(captured.message, "bad row 17");
    assert!(!captured.panicked);

    let records = read_records(&report.artifact);
    let failure = records.last().unwrap();
    assert_eq!(failure["level"], "CRITICAL");
    assert_eq!(failure["message"], FAILURE_MESSAGE);
    assert_eq!(failure["error_message"], "bad row 17");
    assert_eq!(failure["stacktrace"], "RowError { row: 17 }");
    assert_eq!(failure["status"], "FAILURE");
}

#[tokio::test]
async fn test_configuration_error_prevents_execution() {
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);

    let result = monitor(ConfigOverrides::new().with_app_name("etl_orders"))
        .run(|_log| async move {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, RowError>(())
        })
        .await;

    let error = result.unwrap_err();
    assert_eq!(error.config_field(), Some("owner"));
    assert!(error.is_fatal());
    assert!(!ran.load(Ordering::SeqCst));
}

#[test]
fn test_sink_error_prevents_execution() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "occupied").unwrap();

    let result = monitor(overrides(&blocker)).run_blocking(|_log| Ok::<_, RowError>(()));
    assert!(matches!(result, Err(ToolboxError::Sink(_))));
}

#[test]
fn test_panic_is_finalized_then_resumed() {
    let dir = TempDir::new().unwrap();
    let monitor = monitor(overrides(dir.path()));

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        monitor.run_blocking(|_log| -> Result<(), RowError> { panic!("division by zero") })
    }));
    let payload = outcome.unwrap_err();
    assert_eq!(
        super::types::panic_message(payload.as_ref()),
        "division by zero"
    );

    let records = read_records(&only_log_file(dir.path()));
    let failure = records.last().unwrap();
    assert_eq!(failure["level"], "CRITICAL");
    assert_eq!(failure["error_type"], "panic");
    assert_eq!(failure["error_message"], "division by zero");
    assert_eq!(failure["panicked"], true);
}

#[tokio::test]
async fn test_panic_while_building_the_future_is_finalized() {
    let dir = TempDir::new().unwrap();
    let monitor = monitor(overrides(dir.path()));

    let outcome = AssertUnwindSafe(monitor.run(
        |_log| -> std::future::Ready<Result<(), RowError>> { panic!("failed before any await") },
    ))
    .catch_unwind()
    .await;
    let payload = outcome.unwrap_err();
    assert_eq!(
        super::types::panic_message(payload.as_ref()),
        "failed before any await"
    );

    let records = read_records(&only_log_file(dir.path()));
    let messages: Vec<&str> = records
        .iter()
        .map(|record| record["message"].as_str().unwrap())
        .collect();
    assert_eq!(messages, ["Execution started", FAILURE_MESSAGE]);
    let failure = records.last().unwrap();
    assert_eq!(failure["error_message"], "failed before any await");
    assert_eq!(failure["panicked"], true);
}

#[test]
fn test_blocking_run() {
    let dir = TempDir::new().unwrap();

    let result = monitor(overrides(dir.path()))
        .run_blocking(|log| {
            log.named("etl.load").info("loaded");
            Ok::<_, RowError>("done")
        })
        .unwrap();

    assert_eq!(result.unwrap(), "done");
    let records = read_records(&only_log_file(dir.path()));
    assert!(records.iter().any(|record| record["logger"] == "etl.load"));
}

#[tokio::test]
async fn test_tracing_events_are_captured_when_enabled() {
    let dir = TempDir::new().unwrap();

    let (_, report) = monitor(overrides(dir.path()).with_capture_tracing(true))
        .run_with_report(|_log| async {
            tracing::info!(target: "etl::transform", rows = 5_u64, "transformed batch");
            Ok::<_, RowError>(())
        })
        .await
        .unwrap();

    let records = read_records(&report.artifact);
    let captured = records
        .iter()
        .find(|record| record["message"] == "transformed batch")
        .unwrap();
    assert_eq!(captured["logger"], "etl::transform");
    assert_eq!(captured["rows"], 5);
}

#[tokio::test]
async fn test_failure_notifies_even_when_channels_fail() {
    let dir = TempDir::new().unwrap();
    // Nothing listens on the discard port
    let config = overrides(dir.path())
        .with_webhook("http://127.0.0.1:9/hook", crate::config::WebhookType::Slack)
        .with_notification_timeout_secs(2);

    let (result, report) = monitor(config)
        .run_with_report(|_log| async { Err::<(), _>(RowError { row: 3 }) })
        .await
        .unwrap();

    assert!(result.is_err());
    assert!(matches!(
        report.dispatch.status("webhook"),
        Some(DeliveryStatus::Failed(_))
    ));
    assert!(matches!(report.upload, UploadOutcome::NotAttempted { .. }));
}

#[tokio::test]
async fn test_session_finish_with_error_does_not_raise() {
    let dir = TempDir::new().unwrap();
    let session = MonitorSession::start(&monitor(overrides(dir.path()))).unwrap();

    session.logger().warning("row 9 looks odd");
    let artifact = session.logger().artifact_path();
    let report = session
        .finish_with_error(&RowError { row: 9 })
        .await;

    assert_eq!(report.outcome(), Outcome::Failure);
    assert_eq!(report.artifact, artifact);
    let records = read_records(&artifact);
    assert_eq!(records.last().unwrap()["error_message"], "bad row 9");
}

#[tokio::test]
async fn test_session_finish_result() {
    let dir = TempDir::new().unwrap();
    let session = MonitorSession::start(&monitor(overrides(dir.path()))).unwrap();

    let result: Result<u32, RowError> = Ok(7);
    let report = session.finish_result(&result).await;
    assert_eq!(report.outcome(), Outcome::Success);
}

#[test]
fn test_dropped_session_closes_log() {
    let dir = TempDir::new().unwrap();
    let session = MonitorSession::start(&monitor(overrides(dir.path()))).unwrap();
    let handle = session.logger().clone();
    handle.info("partial work");

    drop(session);

    assert!(handle.is_closed());
    let records = read_records(&handle.artifact_path());
    assert_eq!(records.len(), 2);
}
