//! Configuration data models
//!
//! This module defines the resolved (immutable) configuration structures and the
//! built-in defaults every source falls back to.

#![allow(missing_docs)]

pub mod logging;
pub mod notification;
pub mod redaction;
pub mod storage;

// Re-export all configuration types
pub use logging::*;
pub use notification::*;
pub use redaction::*;
pub use storage::*;

use serde::Serializer;
use std::path::PathBuf;

/// Default directory for run logs
pub fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// Default SMTP port (submission with STARTTLS)
pub fn default_smtp_port() -> u16 {
    587
}

/// Default timeout for a single notification delivery, in seconds
pub fn default_notification_timeout() -> u64 {
    10
}

/// Default remote key prefix for archived logs
pub fn default_storage_prefix() -> String {
    "logs".to_string()
}

/// Default archival threshold in kilobytes
pub fn default_upload_threshold_kb() -> u64 {
    200
}

/// Default timeout for a single upload, in seconds
pub fn default_storage_timeout() -> u64 {
    30
}

/// Default archive directory for the local backend
pub fn default_local_archive_path() -> PathBuf {
    std::env::temp_dir().join("dt-toolbox-logs")
}

/// Default redaction replacement literal
pub fn default_replacement() -> String {
    "***REDACTED***".to_string()
}

/// Serialize a secret as a mask so resolved configs can be printed safely
pub(crate) fn serialize_masked<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(_) => serializer.serialize_str("********"),
        None => serializer.serialize_none(),
    }
}
