//! Layered configuration resolution

use crate::common::TestRun;
use dt_toolbox::config::{LogLevel, StorageBackend, WebhookType};
use dt_toolbox::{ConfigOverrides, ConfigResolver, EnvSnapshot};
use tokio_test::assert_ok;

const FILE: &str = r#"
app_name: from_file
owner: file-owner@example.com
tags: [file]
log_level: ERROR
notification:
  smtp_host: smtp.file.example.com
  smtp_port: 2525
  smtp_password: ${SMTP_SECRET}
  recipients: [ops@example.com]
  webhook_url: https://chat.googleapis.com/v1/spaces/X/messages
  webhook_type: gchat
storage:
  enabled: true
  backend: s3
  bucket_name: file-bucket
  upload_threshold_kb: 512
"#;

#[test]
fn test_each_field_takes_its_highest_source() {
    let run = TestRun::new();
    let path = run.config_file(FILE);
    let env = EnvSnapshot::empty()
        .with_var("SMTP_SECRET", "s3cr3t")
        .with_var("DTB_OWNER", "env-owner@example.com")
        .with_var("DTB_LOG_LEVEL", "warning")
        .with_var("DTB_STORAGE_BUCKET", "env-bucket");
    let overrides = ConfigOverrides::new().with_log_level(LogLevel::Debug);

    let config = assert_ok!(ConfigResolver::resolve(Some(&path), &env, &overrides));

    // File only
    assert_eq!(config.app_name, "from_file");
    assert_eq!(config.tags, ["file"]);
    assert_eq!(config.notification.smtp.port, 2525);
    assert_eq!(config.notification.webhook_type, WebhookType::Gchat);
    assert_eq!(config.storage.backend, StorageBackend::S3);
    assert_eq!(config.storage.upload_threshold_kb, 512);
    // Env over file
    assert_eq!(config.owner, "env-owner@example.com");
    assert_eq!(config.storage.bucket.as_deref(), Some("env-bucket"));
    // Override over env over file
    assert_eq!(config.log_level, LogLevel::Debug);
    // Interpolated from the environment
    assert_eq!(config.notification.smtp.password.as_deref(), Some("s3cr3t"));
    // Defaults fill the rest
    assert!(!config.notify_on_success);
    assert_eq!(config.storage.prefix, "logs");
}

#[test]
fn test_resolved_config_prints_without_secrets() {
    let run = TestRun::new();
    let path = run.config_file(FILE);
    let env = EnvSnapshot::empty().with_var("SMTP_SECRET", "s3cr3t");

    let config = ConfigResolver::resolve(Some(&path), &env, &ConfigOverrides::new()).unwrap();
    let yaml = config.to_yaml().unwrap();

    assert!(yaml.contains("from_file"));
    assert!(!yaml.contains("s3cr3t"));
}

#[test]
fn test_invalid_values_name_their_field() {
    let run = TestRun::new();
    let base = run.overrides();

    let bad_recipient = base.clone().with_recipients(["ok@example.com", "not-an-email"]);
    let err = ConfigResolver::resolve(None, &run.env, &bad_recipient).unwrap_err();
    assert_eq!(err.config_field(), Some("recipients[1]"));

    let env = EnvSnapshot::empty().with_var("DTB_SMTP_PORT", "smtp");
    let err = ConfigResolver::resolve(None, &env, &base).unwrap_err();
    assert_eq!(err.config_field(), Some("notification.smtp_port"));

    let env = EnvSnapshot::empty().with_var("DTB_LOG_LEVEL", "verbose");
    let err = ConfigResolver::resolve(None, &env, &base).unwrap_err();
    assert_eq!(err.config_field(), Some("log_level"));

    let missing_owner = ConfigOverrides::new().with_app_name("etl_orders");
    let err = ConfigResolver::resolve(None, &run.env, &missing_owner).unwrap_err();
    assert_eq!(err.config_field(), Some("owner"));
}

#[test]
fn test_storage_backend_checked_only_when_enabled() {
    let run = TestRun::new();

    let env = EnvSnapshot::empty().with_var("DTB_STORAGE_BACKEND", "gcs");
    assert_ok!(ConfigResolver::resolve(None, &env, &run.overrides()));

    let env = env.with_var("DTB_STORAGE_ENABLED", "true");
    let err = ConfigResolver::resolve(None, &env, &run.overrides()).unwrap_err();
    assert_eq!(err.config_field(), Some("storage.backend"));
}

#[test]
fn test_malformed_file_is_a_configuration_error() {
    let run = TestRun::new();
    let path = run.config_file("app_name: [unterminated");

    let err = ConfigResolver::resolve(Some(&path), &run.env, &run.overrides()).unwrap_err();
    assert_eq!(err.config_field(), Some("config_file"));
    assert!(err.is_fatal());
}
