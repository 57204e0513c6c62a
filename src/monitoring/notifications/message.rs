//! Channel-agnostic notification content
//!
//! Built once per dispatch from the resolved configuration and the execution
//! result. Each channel renders it into its own wire format. Text leaves the
//! process only after the same redaction the run log applies.

use crate::config::Config;
use crate::monitoring::types::{CapturedError, ExecutionResult, Outcome};
use crate::observability::{Redactor, RunIdentity};
use crate::utils::format_duration;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Critical,
}

/// Everything a channel needs to describe one run
#[derive(Debug, Clone, Serialize)]
pub struct NotificationMessage {
    pub subject: String,
    pub body: String,
    pub severity: Severity,
    pub app_name: String,
    pub owner: String,
    pub outcome: Outcome,
    pub tags: Vec<String>,
    pub duration: String,
    pub started_at: DateTime<Utc>,
    pub run_id: String,
    pub trace_id: String,
    pub log_file: Option<String>,
    /// Error type and message, failures only
    pub error: Option<ErrorSummary>,
    /// Captured stack representation, failures only
    pub stack: Option<String>,
}

/// Short description of the captured failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSummary {
    pub type_name: String,
    pub message: String,
}

impl NotificationMessage {
    pub fn build(
        config: &Config,
        result: &ExecutionResult,
        identity: &RunIdentity,
        log_file: Option<&Path>,
    ) -> Self {
        let failure: Option<&CapturedError> = match result.outcome {
            Outcome::Failure => result.error.as_ref(),
            Outcome::Success => None,
        };

        let redactor = Redactor::new(&config.redaction);
        let redact = |text: &str| redactor.redact(text).into_owned();
        let app_name = redact(config.app_name.as_str());
        let owner = redact(config.owner.as_str());

        let mut message = Self {
            subject: format!(
                "[{}] {} run {} (owner: {})",
                result.outcome, app_name, identity.run_id, owner
            ),
            body: String::new(),
            severity: match result.outcome {
                Outcome::Success => Severity::Info,
                Outcome::Failure => Severity::Critical,
            },
            app_name,
            owner,
            outcome: result.outcome,
            tags: config.tags.iter().map(|tag| redact(tag.as_str())).collect(),
            duration: format_duration(result.duration()),
            started_at: result.started_at,
            run_id: identity.run_id.clone(),
            trace_id: identity.trace_id.clone(),
            log_file: log_file.map(|path| path.display().to_string()),
            error: failure.map(|error| ErrorSummary {
                type_name: redact(error.type_name.as_str()),
                message: redact(error.message.as_str()),
            }),
            stack: failure.map(|error| redact(error.stack.as_str())),
        };
        message.body = message.render_text(true);
        message
    }

    /// Key facts as label/value pairs, in display order
    pub fn facts(&self) -> Vec<(&'static str, String)> {
        let mut facts = vec![
            ("Application", self.app_name.clone()),
            ("Owner", self.owner.clone()),
            ("Status", self.outcome.to_string()),
            ("Run ID", self.run_id.clone()),
            ("Start Time", self.started_at.to_rfc3339()),
            ("Duration", self.duration.clone()),
        ];
        if !self.tags.is_empty() {
            facts.push(("Tags", self.tags.join(", ")));
        }
        if let Some(log_file) = &self.log_file {
            facts.push(("Log File", log_file.clone()));
        }
        facts
    }

    /// Plain text rendering, optionally with the stack representation
    pub fn render_text(&self, include_stack: bool) -> String {
        let mut text = format!("{} - {}\n\n", self.app_name, self.outcome);
        for (label, value) in self.facts() {
            text.push_str(&format!("{}: {}\n", label, value));
        }

        if let Some(error) = &self.error {
            text.push_str(&format!("\nError Type: {}\n", error.type_name));
            text.push_str(&format!("Error Message: {}\n", error.message));
        }

        if include_stack {
            if let Some(stack) = &self.stack {
                text.push_str(&format!("\nStack Trace:\n{}\n", stack));
            }
        }

        text
    }
}
