//! Monitored runs through the public API

use crate::common::{assert_context, read_records, TestRun};
use dt_toolbox::config::StorageBackend;
use dt_toolbox::monitoring::FAILURE_MESSAGE;
use dt_toolbox::{init_monitoring, MonitorSession, Outcome, UploadOutcome};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_every_record_carries_run_context() {
    let run = TestRun::new();

    let (_, report) = run
        .monitor(run.overrides())
        .run_with_report(|log| async move {
            log.info_with("extracted", json!({"rows": 1200, "source": "orders"}));
            log.named("etl.load").warning("slow insert");
            Ok::<_, std::io::Error>(())
        })
        .await
        .unwrap();

    let records = read_records(&report.artifact);
    assert!(records.len() >= 4);
    for record in &records {
        assert_context(record);
        assert_eq!(record["tags"], json!(["orders", "nightly"]));
        assert_eq!(record["run_id"], report.identity.run_id);
    }

    let extracted = records.iter().find(|r| r["message"] == "extracted").unwrap();
    assert_eq!(extracted["rows"], 1200);
    assert_eq!(extracted["source"], "orders");
    let slow = records.iter().find(|r| r["message"] == "slow insert").unwrap();
    assert_eq!(slow["logger"], "etl.load");
    assert_eq!(slow["level"], "WARNING");
}

#[tokio::test]
async fn test_logging_from_many_tasks_keeps_lines_whole() {
    let run = TestRun::new();

    let (_, report) = run
        .monitor(run.overrides())
        .run_with_report(|log| async move {
            let mut tasks = Vec::new();
            for worker in 0..8 {
                let log = log.clone();
                tasks.push(tokio::spawn(async move {
                    for row in 0..100 {
                        log.info_with("row", json!({"worker": worker, "row": row}));
                    }
                }));
            }
            for task in tasks {
                task.await.unwrap();
            }
            Ok::<_, std::io::Error>(())
        })
        .await
        .unwrap();

    let rows = read_records(&report.artifact)
        .into_iter()
        .filter(|record| record["message"] == "row")
        .count();
    assert_eq!(rows, 800);
}

#[tokio::test]
async fn test_concurrent_runs_have_separate_artifacts() {
    let run = Arc::new(TestRun::new());

    let first = {
        let run = Arc::clone(&run);
        tokio::spawn(async move {
            run.monitor(run.overrides())
                .run_with_report(|log| async move {
                    log.info("first");
                    Ok::<_, std::io::Error>(())
                })
                .await
                .unwrap()
                .1
        })
    };
    let second = {
        let run = Arc::clone(&run);
        tokio::spawn(async move {
            run.monitor(run.overrides())
                .run_with_report(|log| async move {
                    log.info("second");
                    Ok::<_, std::io::Error>(())
                })
                .await
                .unwrap()
                .1
        })
    };

    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert_ne!(first.artifact, second.artifact);
    assert_ne!(first.identity.run_id, second.identity.run_id);
    let first_messages: Vec<_> = read_records(&first.artifact)
        .into_iter()
        .map(|record| record["message"].clone())
        .collect();
    assert!(first_messages.contains(&json!("first")));
    assert!(!first_messages.contains(&json!("second")));
}

#[tokio::test]
async fn test_failed_run_still_archives() {
    let run = TestRun::new();
    let overrides = run
        .overrides()
        .with_storage(StorageBackend::Local)
        .with_local_archive_path(run.archive_dir())
        .with_upload_threshold_kb(0);

    let (result, report) = run
        .monitor(overrides)
        .run_with_report(|_log| async {
            Err::<(), _>(std::io::Error::other("source table missing"))
        })
        .await
        .unwrap();

    assert!(result.is_err());
    assert_eq!(report.outcome(), Outcome::Failure);
    assert!(report.upload.is_uploaded(), "{:?}", report.upload);

    let key = report.upload.key().unwrap();
    let archived = read_records(&run.archive_dir().join(key));
    let last = archived.last().unwrap();
    assert_eq!(last["message"], FAILURE_MESSAGE);
    assert_eq!(last["error_message"], "source table missing");
}

#[tokio::test]
async fn test_session_mode() {
    let run = TestRun::new();
    let session = MonitorSession::start(&run.monitor(run.overrides())).unwrap();

    session.logger().info("manual step");
    let report = session.finish().await;

    assert_eq!(report.outcome(), Outcome::Success);
    assert!(matches!(report.upload, UploadOutcome::NotAttempted { .. }));
    let records = read_records(&report.artifact);
    assert_eq!(records.last().unwrap()["message"], "Execution completed successfully");
}

#[test]
fn test_init_monitoring_rejects_invalid_owner() {
    let err = init_monitoring(
        dt_toolbox::ConfigOverrides::new()
            .with_app_name("etl_orders")
            .with_owner("not-an-email"),
    )
    .unwrap_err();
    assert_eq!(err.config_field(), Some("owner"));
}
