//! Partial configuration layers
//!
//! Every source (explicit overrides, environment, YAML file) produces the same
//! `ConfigLayer` shape: every field optional. Layers are merged field by field,
//! so a field missing from a higher source falls through to the next one.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File values may be native YAML scalars or interpolated `${VAR}` strings
mod scalar {
    use crate::config::loader::parse_bool_value;
    use serde::de::{self, Deserialize, Deserializer};
    use std::fmt::Display;
    use std::str::FromStr;

    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Native(T),
        Text(String),
    }

    pub fn number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        match Option::<Raw<T>>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Native(value)) => Ok(Some(value)),
            Some(Raw::Text(text)) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| de::Error::custom(format!("'{}': {}", text, e))),
        }
    }

    pub fn boolean<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw<bool>>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Native(value)) => Ok(Some(value)),
            Some(Raw::Text(text)) => parse_bool_value(&text)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("'{}' is not a boolean", text))),
        }
    }
}

/// One configuration source, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub app_name: Option<String>,
    pub owner: Option<String>,
    pub tags: Option<Vec<String>>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_rotation: Option<String>,
    #[serde(deserialize_with = "scalar::boolean")]
    pub console: Option<bool>,
    #[serde(deserialize_with = "scalar::boolean")]
    pub capture_tracing: Option<bool>,
    pub notification: NotificationLayer,
    pub storage: StorageLayer,
    pub redaction: RedactionLayer,
}

/// Notification fields of a layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationLayer {
    #[serde(deserialize_with = "scalar::boolean")]
    pub enabled: Option<bool>,
    #[serde(deserialize_with = "scalar::boolean")]
    pub notify_on_success: Option<bool>,
    pub recipients: Option<Vec<String>>,
    pub smtp_host: Option<String>,
    #[serde(deserialize_with = "scalar::number")]
    pub smtp_port: Option<i64>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    #[serde(deserialize_with = "scalar::boolean")]
    pub smtp_use_tls: Option<bool>,
    pub webhook_url: Option<String>,
    pub webhook_type: Option<String>,
    #[serde(deserialize_with = "scalar::boolean")]
    pub webhook_include_stacktrace: Option<bool>,
    #[serde(deserialize_with = "scalar::number")]
    pub timeout_secs: Option<u64>,
}

/// Storage fields of a layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageLayer {
    #[serde(deserialize_with = "scalar::boolean")]
    pub enabled: Option<bool>,
    pub backend: Option<String>,
    #[serde(alias = "bucket")]
    pub bucket_name: Option<String>,
    pub prefix: Option<String>,
    #[serde(deserialize_with = "scalar::number")]
    pub upload_threshold_kb: Option<u64>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: Option<String>,
    pub minio_endpoint: Option<String>,
    pub minio_access_key: Option<String>,
    pub minio_secret_key: Option<String>,
    pub local_path: Option<PathBuf>,
    #[serde(deserialize_with = "scalar::number")]
    pub timeout_secs: Option<u64>,
}

/// Redaction fields of a layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionLayer {
    #[serde(deserialize_with = "scalar::boolean")]
    pub enabled: Option<bool>,
    pub patterns: Option<Vec<String>>,
    pub replacement: Option<String>,
}

impl ConfigLayer {
    /// Merge with a lower-precedence layer: every field set here wins
    pub fn over(self, lower: Self) -> Self {
        Self {
            app_name: self.app_name.or(lower.app_name),
            owner: self.owner.or(lower.owner),
            tags: self.tags.or(lower.tags),
            log_dir: self.log_dir.or(lower.log_dir),
            log_level: self.log_level.or(lower.log_level),
            log_rotation: self.log_rotation.or(lower.log_rotation),
            console: self.console.or(lower.console),
            capture_tracing: self.capture_tracing.or(lower.capture_tracing),
            notification: self.notification.over(lower.notification),
            storage: self.storage.over(lower.storage),
            redaction: self.redaction.over(lower.redaction),
        }
    }

    /// Whether no field is set at all
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl NotificationLayer {
    /// Merge with a lower-precedence layer
    pub fn over(self, lower: Self) -> Self {
        Self {
            enabled: self.enabled.or(lower.enabled),
            notify_on_success: self.notify_on_success.or(lower.notify_on_success),
            recipients: self.recipients.or(lower.recipients),
            smtp_host: self.smtp_host.or(lower.smtp_host),
            smtp_port: self.smtp_port.or(lower.smtp_port),
            smtp_user: self.smtp_user.or(lower.smtp_user),
            smtp_password: self.smtp_password.or(lower.smtp_password),
            smtp_from: self.smtp_from.or(lower.smtp_from),
            smtp_use_tls: self.smtp_use_tls.or(lower.smtp_use_tls),
            webhook_url: self.webhook_url.or(lower.webhook_url),
            webhook_type: self.webhook_type.or(lower.webhook_type),
            webhook_include_stacktrace: self
                .webhook_include_stacktrace
                .or(lower.webhook_include_stacktrace),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
        }
    }
}

impl StorageLayer {
    /// Merge with a lower-precedence layer
    pub fn over(self, lower: Self) -> Self {
        Self {
            enabled: self.enabled.or(lower.enabled),
            backend: self.backend.or(lower.backend),
            bucket_name: self.bucket_name.or(lower.bucket_name),
            prefix: self.prefix.or(lower.prefix),
            upload_threshold_kb: self.upload_threshold_kb.or(lower.upload_threshold_kb),
            aws_access_key_id: self.aws_access_key_id.or(lower.aws_access_key_id),
            aws_secret_access_key: self.aws_secret_access_key.or(lower.aws_secret_access_key),
            aws_region: self.aws_region.or(lower.aws_region),
            minio_endpoint: self.minio_endpoint.or(lower.minio_endpoint),
            minio_access_key: self.minio_access_key.or(lower.minio_access_key),
            minio_secret_key: self.minio_secret_key.or(lower.minio_secret_key),
            local_path: self.local_path.or(lower.local_path),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
        }
    }
}

impl RedactionLayer {
    /// Merge with a lower-precedence layer
    pub fn over(self, lower: Self) -> Self {
        Self {
            enabled: self.enabled.or(lower.enabled),
            patterns: self.patterns.or(lower.patterns),
            replacement: self.replacement.or(lower.replacement),
        }
    }
}
