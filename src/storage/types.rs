//! Storage types

use serde::Serialize;

/// What happened to the log artifact after the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// Archival disabled or the artifact is below the threshold
    NotAttempted { reason: String },
    /// The artifact was stored under `key`
    Uploaded { key: String, url: String },
    /// The upload was attempted and failed
    Failed { reason: String },
}

impl UploadOutcome {
    pub fn not_attempted(reason: impl Into<String>) -> Self {
        Self::NotAttempted {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Remote key of an uploaded artifact
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Uploaded { key, .. } => Some(key),
            _ => None,
        }
    }
}
