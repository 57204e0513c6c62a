//! Explicit configuration overrides
//!
//! `ConfigOverrides` is the programmatic source with the highest precedence.
//! Every setter fills one field of the underlying [`ConfigLayer`]; fields left
//! untouched fall through to the environment, the file and the defaults.

use super::layer::ConfigLayer;
use super::models::{LogLevel, LogRotation, StorageBackend, WebhookType};
use std::path::PathBuf;

/// Builder for the explicit-argument configuration layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    layer: ConfigLayer,
}

impl ConfigOverrides {
    /// Create an empty set of overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing layer
    pub fn from_layer(layer: ConfigLayer) -> Self {
        Self { layer }
    }

    /// The layer these overrides contribute
    pub fn layer(&self) -> &ConfigLayer {
        &self.layer
    }

    /// Consume into the underlying layer
    pub fn into_layer(self) -> ConfigLayer {
        self.layer
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.layer.app_name = Some(app_name.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.layer.owner = Some(owner.into());
        self
    }

    /// Replace the tag list
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layer.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Append one tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.layer.tags.get_or_insert_with(Vec::new).push(tag.into());
        self
    }

    /// Replace the recipient list
    pub fn with_recipients<I, S>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layer.notification.recipients =
            Some(recipients.into_iter().map(Into::into).collect());
        self
    }

    /// Append one recipient
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.layer
            .notification
            .recipients
            .get_or_insert_with(Vec::new)
            .push(recipient.into());
        self
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.layer.log_dir = Some(log_dir.into());
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.layer.log_level = Some(level.as_str().to_string());
        self
    }

    pub fn with_log_rotation(mut self, rotation: LogRotation) -> Self {
        self.layer.log_rotation = Some(rotation.as_str().to_string());
        self
    }

    pub fn with_console(mut self, console: bool) -> Self {
        self.layer.console = Some(console);
        self
    }

    pub fn with_capture_tracing(mut self, capture: bool) -> Self {
        self.layer.capture_tracing = Some(capture);
        self
    }

    pub fn with_notify_on_success(mut self, notify: bool) -> Self {
        self.layer.notification.notify_on_success = Some(notify);
        self
    }

    /// Master switch for every notification channel
    pub fn with_notifications_enabled(mut self, enabled: bool) -> Self {
        self.layer.notification.enabled = Some(enabled);
        self
    }

    /// SMTP server and login
    pub fn with_smtp(
        mut self,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let notification = &mut self.layer.notification;
        notification.smtp_host = Some(host.into());
        notification.smtp_port = Some(i64::from(port));
        notification.smtp_user = Some(user.into());
        notification.smtp_password = Some(password.into());
        self
    }

    pub fn with_smtp_from(mut self, from: impl Into<String>) -> Self {
        self.layer.notification.smtp_from = Some(from.into());
        self
    }

    pub fn with_smtp_tls(mut self, use_tls: bool) -> Self {
        self.layer.notification.smtp_use_tls = Some(use_tls);
        self
    }

    pub fn with_webhook(mut self, url: impl Into<String>, webhook_type: WebhookType) -> Self {
        self.layer.notification.webhook_url = Some(url.into());
        self.layer.notification.webhook_type = Some(webhook_type.as_str().to_string());
        self
    }

    pub fn with_webhook_stacktrace(mut self, include: bool) -> Self {
        self.layer.notification.webhook_include_stacktrace = Some(include);
        self
    }

    pub fn with_notification_timeout_secs(mut self, secs: u64) -> Self {
        self.layer.notification.timeout_secs = Some(secs);
        self
    }

    /// Enable archival to the given backend
    pub fn with_storage(mut self, backend: StorageBackend) -> Self {
        self.layer.storage.enabled = Some(true);
        self.layer.storage.backend = Some(backend.as_str().to_string());
        self
    }

    pub fn with_storage_enabled(mut self, enabled: bool) -> Self {
        self.layer.storage.enabled = Some(enabled);
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.layer.storage.bucket_name = Some(bucket.into());
        self
    }

    pub fn with_storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.layer.storage.prefix = Some(prefix.into());
        self
    }

    pub fn with_upload_threshold_kb(mut self, threshold_kb: u64) -> Self {
        self.layer.storage.upload_threshold_kb = Some(threshold_kb);
        self
    }

    pub fn with_local_archive_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.layer.storage.local_path = Some(path.into());
        self
    }

    pub fn with_aws_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        let storage = &mut self.layer.storage;
        storage.aws_access_key_id = Some(access_key_id.into());
        storage.aws_secret_access_key = Some(secret_access_key.into());
        storage.aws_region = Some(region.into());
        self
    }

    pub fn with_minio(
        mut self,
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        let storage = &mut self.layer.storage;
        storage.minio_endpoint = Some(endpoint.into());
        storage.minio_access_key = Some(access_key.into());
        storage.minio_secret_key = Some(secret_key.into());
        self
    }

    pub fn with_storage_timeout_secs(mut self, secs: u64) -> Self {
        self.layer.storage.timeout_secs = Some(secs);
        self
    }

    pub fn with_redaction_enabled(mut self, enabled: bool) -> Self {
        self.layer.redaction.enabled = Some(enabled);
        self
    }

    /// Extra redaction patterns, applied after the built-in ones
    pub fn with_redaction_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layer.redaction.patterns = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_redaction_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.layer.redaction.replacement = Some(replacement.into());
        self
    }
}
