//! Configuration management for monitored runs
//!
//! A [`Config`] is resolved once per run from three sources (explicit
//! overrides, `DTB_*` environment variables, a YAML file) plus built-in
//! defaults, validated, and then shared read-only as `Arc<Config>`.

pub mod builder;
pub mod layer;
pub mod loader;
pub mod models;
pub mod resolver;
pub mod validation;

pub use builder::ConfigOverrides;
pub use layer::ConfigLayer;
pub use loader::EnvSnapshot;
pub use models::*;
pub use resolver::ConfigResolver;
pub use validation::Validate;

use crate::utils::error::{Result, ToolboxError};
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

/// Resolved configuration for one monitored run
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Name of the monitored job
    pub app_name: String,
    /// Responsible person, an email address
    pub owner: String,
    /// Notification recipients
    pub recipients: Vec<String>,
    /// Free-form labels carried on every record
    pub tags: Vec<String>,
    /// Root directory for run logs
    pub log_dir: PathBuf,
    /// Minimum severity written to the run log
    pub log_level: LogLevel,
    /// Log file rotation
    pub log_rotation: LogRotation,
    /// Mirror records to stdout
    pub console: bool,
    /// Capture `tracing` events emitted by the monitored work
    pub capture_tracing: bool,
    /// Also notify when the run succeeds
    pub notify_on_success: bool,
    /// Notification channels
    pub notification: NotificationConfig,
    /// Log archival
    pub storage: StorageConfig,
    /// Redaction of sensitive substrings
    pub redaction: RedactionConfig,
}

impl Config {
    /// Apply defaults to a merged layer and validate the result
    pub fn from_layer(layer: ConfigLayer) -> Result<Self> {
        let ConfigLayer {
            app_name,
            owner,
            tags,
            log_dir,
            log_level,
            log_rotation,
            console,
            capture_tracing,
            notification,
            storage,
            redaction,
        } = layer;

        let smtp_port = match notification.smtp_port {
            Some(port) => u16::try_from(port)
                .ok()
                .filter(|port| *port > 0)
                .ok_or_else(|| {
                    ToolboxError::config(
                        "notification.smtp_port",
                        format!("port must be between 1 and 65535, got {}", port),
                    )
                })?,
            None => default_smtp_port(),
        };

        let storage_enabled = storage.enabled.unwrap_or(false);
        let backend = match storage.backend {
            Some(raw) => match raw.parse::<StorageBackend>() {
                Ok(backend) => backend,
                Err(message) if storage_enabled => {
                    return Err(ToolboxError::config("storage.backend", message));
                }
                Err(message) => {
                    debug!("Ignoring storage backend while storage is disabled: {}", message);
                    StorageBackend::default()
                }
            },
            None => StorageBackend::default(),
        };

        let redaction = RedactionConfig::compile(
            redaction.enabled.unwrap_or(true),
            redaction.patterns.as_deref().unwrap_or_default(),
            redaction.replacement.unwrap_or_else(default_replacement),
        )?;

        let config = Self {
            app_name: required(app_name, "app_name")?,
            owner: required(owner, "owner")?,
            recipients: clean_list(notification.recipients),
            tags: clean_list(tags),
            log_dir: log_dir.unwrap_or_else(default_log_dir),
            log_level: parse_field(log_level, "log_level")?.unwrap_or_default(),
            log_rotation: parse_field(log_rotation, "log_rotation")?.unwrap_or_default(),
            console: console.unwrap_or(true),
            capture_tracing: capture_tracing.unwrap_or(false),
            notify_on_success: notification.notify_on_success.unwrap_or(false),
            notification: NotificationConfig {
                enabled: notification.enabled.unwrap_or(true),
                smtp: SmtpConfig {
                    host: non_blank(notification.smtp_host),
                    port: smtp_port,
                    user: non_blank(notification.smtp_user),
                    password: notification.smtp_password,
                    from: non_blank(notification.smtp_from),
                    use_tls: notification.smtp_use_tls.unwrap_or(true),
                },
                webhook_url: non_blank(notification.webhook_url),
                webhook_type: parse_field(notification.webhook_type, "notification.webhook_type")?
                    .unwrap_or_default(),
                webhook_include_stacktrace: notification.webhook_include_stacktrace.unwrap_or(false),
                timeout_secs: notification
                    .timeout_secs
                    .unwrap_or_else(default_notification_timeout),
            },
            storage: StorageConfig {
                enabled: storage_enabled,
                backend,
                bucket: non_blank(storage.bucket_name),
                prefix: storage
                    .prefix
                    .map(|prefix| prefix.trim_matches('/').to_string())
                    .unwrap_or_else(default_storage_prefix),
                upload_threshold_kb: storage
                    .upload_threshold_kb
                    .unwrap_or_else(default_upload_threshold_kb),
                aws: AwsCredentials {
                    access_key_id: non_blank(storage.aws_access_key_id),
                    secret_access_key: non_blank(storage.aws_secret_access_key),
                    region: non_blank(storage.aws_region),
                },
                minio: MinioConfig {
                    endpoint: non_blank(storage.minio_endpoint),
                    access_key: non_blank(storage.minio_access_key),
                    secret_key: non_blank(storage.minio_secret_key),
                },
                local_path: storage.local_path.unwrap_or_else(default_local_archive_path),
                timeout_secs: storage.timeout_secs.unwrap_or_else(default_storage_timeout),
            },
            redaction,
        };

        config.validate()?;
        Ok(config)
    }

    /// Convert to YAML with secrets masked
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Convert to JSON with secrets masked
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ToolboxError::config(field, "is required")),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_list(values: Option<Vec<String>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn parse_field<T>(value: Option<String>, field: &str) -> Result<Option<T>>
where
    T: FromStr<Err = String>,
{
    value
        .map(|raw| raw.parse::<T>())
        .transpose()
        .map_err(|message| ToolboxError::config(field, message))
}
