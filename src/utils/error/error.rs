//! Error types for the toolbox
//!
//! Configuration and sink errors are fatal and surface to the caller before any
//! monitored work runs. Delivery and storage errors are caught at their own
//! boundary and only ever show up inside a `DispatchReport` or `UploadOutcome`.

#![allow(missing_docs)]

use thiserror::Error;

/// Result type alias for the toolbox
pub type Result<T> = std::result::Result<T, ToolboxError>;

/// Main error type for the toolbox
#[derive(Error, Debug)]
pub enum ToolboxError {
    /// Invalid or unparsable configuration, naming the offending field
    #[error("Configuration error in `{field}`: {message}")]
    Config { field: String, message: String },

    /// The log sink could not be created or written
    #[error("Log sink error: {0}")]
    Sink(String),

    /// Notification channel errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// SMTP delivery errors
    #[error("Email error: {0}")]
    Email(String),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Object storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// An outbound call exceeded its time budget
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolboxError {
    /// Build a configuration error for `field`
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Field named by a configuration error, if this is one
    pub fn config_field(&self) -> Option<&str> {
        match self {
            Self::Config { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }

    /// Whether the error aborts a run before the monitored work starts
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Sink(_))
    }
}
