//! End-to-end scenarios

use crate::common::{assert_no_substring, read_records, TestRun};
use dt_toolbox::config::{StorageBackend, WebhookType};
use dt_toolbox::monitoring::notifications::{EMAIL_CHANNEL, WEBHOOK_CHANNEL};
use dt_toolbox::monitoring::FAILURE_MESSAGE;
use dt_toolbox::{DeliveryStatus, Outcome, UploadOutcome};
use regex::Regex;
use std::fmt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, PartialEq)]
struct ValueError(String);

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A failing job with email and webhook configured: logged, both channels
/// attempted once, error handed back unchanged
#[tokio::test]
async fn test_scenario_failure_is_reported_and_returned() {
    let run = TestRun::new();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let overrides = run
        .overrides()
        .with_notify_on_success(false)
        .with_recipients(["oncall@example.com"])
        // Nothing listens on port 1, the SMTP attempt fails fast
        .with_smtp("127.0.0.1", 1, "bot@example.com", "smtp-pass")
        .with_smtp_tls(false)
        .with_notification_timeout_secs(5)
        .with_webhook(format!("{}/hook", server.uri()), WebhookType::Slack);

    let (result, report) = run
        .monitor(overrides)
        .run_with_report(|log| async move {
            log.info("reading orders.csv");
            Err::<u32, _>(ValueError("bad row".to_string()))
        })
        .await
        .unwrap();

    assert_eq!(result, Err(ValueError("bad row".to_string())));
    assert_eq!(report.outcome(), Outcome::Failure);

    let records = read_records(&report.artifact);
    let failure = records
        .iter()
        .find(|record| record["message"] == FAILURE_MESSAGE)
        .unwrap();
    assert_eq!(failure["level"], "CRITICAL");
    assert_eq!(failure["error_message"], "bad row");
    assert!(failure["error_type"].as_str().unwrap().ends_with("ValueError"));
    assert!(!std::fs::read_to_string(&report.artifact)
        .unwrap()
        .contains("***REDACTED***"));

    assert_eq!(report.dispatch.channels.len(), 2);
    assert!(matches!(
        report.dispatch.status(EMAIL_CHANNEL),
        Some(DeliveryStatus::Failed(_))
    ));
    assert_eq!(
        report.dispatch.status(WEBHOOK_CHANNEL),
        Some(&DeliveryStatus::Delivered)
    );
}

/// A 250 KB log with a 200 KB threshold is archived under a key naming the
/// app and a timestamp
#[tokio::test]
async fn test_scenario_large_log_is_archived() {
    let run = TestRun::new();
    let overrides = run
        .overrides()
        .with_storage(StorageBackend::Local)
        .with_local_archive_path(run.archive_dir())
        .with_upload_threshold_kb(200);

    let (_, report) = run
        .monitor(overrides)
        .run_with_report(|log| async move {
            let path = log.artifact_path();
            let batch = "order line ".repeat(40);
            while std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0) < 250 * 1024 {
                log.info(&batch);
            }
            Ok::<_, ValueError>(())
        })
        .await
        .unwrap();

    let UploadOutcome::Uploaded { key, .. } = &report.upload else {
        panic!("expected upload, got {:?}", report.upload);
    };
    assert!(key.contains("etl_orders"));
    let stamp = Regex::new(r"/\d{8}T\d{6}Z_").unwrap();
    assert!(stamp.is_match(key), "{}", key);
    assert!(run.archive_dir().join(key).exists());
}

/// `password=abc123` never reaches the file
#[tokio::test]
async fn test_scenario_password_is_redacted() {
    let run = TestRun::new();

    let (_, report) = run
        .monitor(run.overrides())
        .run_with_report(|log| async move {
            log.info("connecting with password=abc123");
            Ok::<_, ValueError>(())
        })
        .await
        .unwrap();

    assert_no_substring(&report.artifact, "abc123");
    let records = read_records(&report.artifact);
    let message = records
        .iter()
        .map(|record| record["message"].as_str().unwrap())
        .find(|message| message.starts_with("connecting with"))
        .unwrap();
    assert_eq!(message, "connecting with ***REDACTED***");
}
