//! Webhook delivery against a mock server

use crate::common::TestRun;
use dt_toolbox::config::WebhookType;
use dt_toolbox::monitoring::notifications::WEBHOOK_CHANNEL;
use dt_toolbox::{DeliveryStatus, Outcome};
use serde_json::Value;
use std::fmt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug)]
struct LoadError(&'static str);

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

async fn webhook_server(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(&server)
        .await;
    server
}

async fn only_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    requests[0].body_json().unwrap()
}

#[tokio::test]
async fn test_failure_posts_slack_payload() {
    let run = TestRun::new();
    let server = webhook_server(200).await;
    let overrides = run
        .overrides()
        .with_webhook(format!("{}/hook", server.uri()), WebhookType::Slack);

    let (result, report) = run
        .monitor(overrides)
        .run_with_report(|_log| async { Err::<(), _>(LoadError("warehouse unavailable")) })
        .await
        .unwrap();

    assert!(result.is_err());
    assert_eq!(report.outcome(), Outcome::Failure);
    assert_eq!(
        report.dispatch.status(WEBHOOK_CHANNEL),
        Some(&DeliveryStatus::Delivered)
    );

    let body = only_body(&server).await;
    let text = body["text"].as_str().unwrap();
    assert!(text.starts_with("[FAILURE] etl_orders run "));
    let attachment = &body["attachments"][0];
    assert_eq!(attachment["color"], "danger");
    assert!(attachment["text"]
        .as_str()
        .unwrap()
        .contains("warehouse unavailable"));
}

#[tokio::test]
async fn test_success_posts_gchat_payload_when_enabled() {
    let run = TestRun::new();
    let server = webhook_server(200).await;
    let overrides = run
        .overrides()
        .with_notify_on_success(true)
        .with_webhook(format!("{}/hook", server.uri()), WebhookType::Gchat);

    let (_, report) = run
        .monitor(overrides)
        .run_with_report(|_log| async { Ok::<_, LoadError>(()) })
        .await
        .unwrap();

    assert_eq!(report.dispatch.delivered_count(), 1);
    let body = only_body(&server).await;
    assert_eq!(body.as_object().unwrap().len(), 1);
    let text = body["text"].as_str().unwrap();
    assert!(text.starts_with("*etl_orders* - SUCCESS"));
    assert!(text.contains("• *Tags:* orders, nightly"));
}

#[tokio::test]
async fn test_success_without_opt_in_sends_nothing() {
    let run = TestRun::new();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let overrides = run
        .overrides()
        .with_webhook(format!("{}/hook", server.uri()), WebhookType::Slack);

    let (_, report) = run
        .monitor(overrides)
        .run_with_report(|_log| async { Ok::<_, LoadError>(()) })
        .await
        .unwrap();

    assert!(report.dispatch.nothing_attempted());
}

#[tokio::test]
async fn test_server_error_is_reported_not_raised() {
    let run = TestRun::new();
    let server = webhook_server(500).await;
    let overrides = run
        .overrides()
        .with_webhook(format!("{}/hook", server.uri()), WebhookType::Slack);

    let (result, report) = run
        .monitor(overrides)
        .run_with_report(|_log| async { Err::<(), _>(LoadError("boom")) })
        .await
        .unwrap();

    assert!(result.is_err());
    match report.dispatch.status(WEBHOOK_CHANNEL) {
        Some(DeliveryStatus::Failed(reason)) => {
            assert!(reason.contains("500"), "{}", reason);
            assert!(!reason.contains(&server.uri()), "{}", reason);
        }
        other => panic!("expected failure, got {:?}", other),
    }
}
