//! Configuration validators
//!
//! Checks that need the whole merged value: identity fields, addresses, URLs and
//! backend requirements. Parsing errors (ports, enums, patterns) are raised earlier
//! while the layer is turned into a `Config`.

use super::trait_def::Validate;
use crate::config::Config;
use crate::config::models::*;
use crate::utils::error::{Result, ToolboxError};
use crate::utils::{is_valid_email, is_valid_http_url};
use tracing::{debug, warn};

impl Validate for Config {
    fn validate(&self) -> Result<()> {
        debug!("Validating configuration for {}", self.app_name);

        if self.app_name.trim().is_empty() {
            return Err(ToolboxError::config("app_name", "is required"));
        }

        if !is_valid_email(&self.owner) {
            return Err(ToolboxError::config(
                "owner",
                format!("'{}' is not a valid email address", self.owner),
            ));
        }

        for (index, recipient) in self.recipients.iter().enumerate() {
            if !is_valid_email(recipient) {
                return Err(ToolboxError::config(
                    format!("recipients[{}]", index),
                    format!("'{}' is not a valid email address", recipient),
                ));
            }
        }

        self.notification.validate()?;
        self.storage.validate()?;

        if self.notification.enabled
            && self.recipients.is_empty()
            && self.notification.email_missing_settings().is_none()
        {
            warn!("SMTP is configured but no recipients are set, email will be skipped");
        }

        Ok(())
    }
}

impl Validate for NotificationConfig {
    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.webhook_url {
            if !is_valid_http_url(url) {
                return Err(ToolboxError::config(
                    "notification.webhook_url",
                    "must be an absolute http(s) URL",
                ));
            }
        }

        if let Some(from) = &self.smtp.from {
            if !is_valid_email(from) {
                return Err(ToolboxError::config(
                    "notification.smtp_from",
                    format!("'{}' is not a valid email address", from),
                ));
            }
        }

        if self.timeout_secs == 0 {
            return Err(ToolboxError::config(
                "notification.timeout_secs",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Validate for StorageConfig {
    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ToolboxError::config(
                "storage.timeout_secs",
                "must be greater than 0",
            ));
        }

        if !self.enabled {
            return Ok(());
        }

        match self.backend {
            StorageBackend::S3 | StorageBackend::Minio if self.bucket.is_none() => {
                Err(ToolboxError::config(
                    "storage.bucket_name",
                    format!("is required for the {} backend", self.backend.as_str()),
                ))
            }
            StorageBackend::Minio => match self.minio.endpoint.as_deref() {
                None => Err(ToolboxError::config(
                    "storage.minio_endpoint",
                    "is required for the minio backend",
                )),
                Some(endpoint) if !is_valid_http_url(endpoint) => Err(ToolboxError::config(
                    "storage.minio_endpoint",
                    "must be an absolute http(s) URL",
                )),
                Some(_) => Ok(()),
            },
            StorageBackend::S3 | StorageBackend::Local => Ok(()),
        }
    }
}
