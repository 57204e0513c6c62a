//! Type definitions for monitored runs

use crate::monitoring::notifications::DispatchReport;
use crate::observability::RunIdentity;
use crate::storage::UploadOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Classification of a finished unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "SUCCESS",
            Outcome::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure captured from the monitored work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedError {
    /// Type name of the error value, or `panic`
    pub type_name: String,
    /// `Display` rendering of the error, or the panic payload
    pub message: String,
    /// `Debug` rendering of the error, or the panic location
    pub stack: String,
    /// Whether the work panicked instead of returning an error
    pub panicked: bool,
}

impl CapturedError {
    /// Capture an error value returned by the work
    pub fn from_error<E>(error: &E) -> Self
    where
        E: fmt::Display + fmt::Debug + ?Sized,
    {
        Self {
            type_name: std::any::type_name::<E>().to_string(),
            message: error.to_string(),
            stack: format!("{:?}", error),
            panicked: false,
        }
    }

    /// Capture a panic payload
    pub fn from_panic(payload: &(dyn Any + Send), location: Option<String>) -> Self {
        let message = panic_message(payload);
        let stack = match location {
            Some(location) => format!("panicked at {}: {}", location, message),
            None => format!("panicked: {}", message),
        };

        Self {
            type_name: "panic".to_string(),
            message,
            stack,
            panicked: true,
        }
    }

    /// One-line summary, `<type>: <message>`
    pub fn summary(&self) -> String {
        format!("{}: {}", self.type_name, self.message)
    }
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Result of one monitored execution
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub outcome: Outcome,
    pub error: Option<CapturedError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn success(started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        Self {
            outcome: Outcome::Success,
            error: None,
            started_at,
            finished_at,
        }
    }

    pub fn failure(
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        error: CapturedError,
    ) -> Self {
        Self {
            outcome: Outcome::Failure,
            error: Some(error),
            started_at,
            finished_at,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Wall-clock duration; zero if the clock went backwards
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}

/// Lifecycle of a monitored run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Configuring,
    Running,
    Succeeded,
    Failed,
    Finalizing,
    Done,
}

impl RunState {
    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Configuring, RunState::Running)
                | (RunState::Running, RunState::Succeeded)
                | (RunState::Running, RunState::Failed)
                | (RunState::Succeeded, RunState::Finalizing)
                | (RunState::Failed, RunState::Finalizing)
                | (RunState::Finalizing, RunState::Done)
        )
    }
}

/// Everything that happened during one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub identity: RunIdentity,
    pub execution: ExecutionResult,
    pub dispatch: DispatchReport,
    pub upload: UploadOutcome,
    /// Log file of the run
    pub artifact: PathBuf,
    /// First write error of the log sink, if any
    pub sink_error: Option<String>,
}

impl RunReport {
    pub fn outcome(&self) -> Outcome {
        self.execution.outcome
    }
}
