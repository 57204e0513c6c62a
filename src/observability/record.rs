//! Structured log records
//!
//! A record is one line of the run log: a fixed set of reserved keys plus
//! whatever structured fields the caller attached.

use super::redaction::Redactor;
use crate::config::{Config, LogLevel};
use crate::utils::{generate_run_id, generate_trace_id};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys owned by the pipeline; caller fields with these names are dropped
pub const RESERVED_KEYS: &[&str] = &[
    "timestamp",
    "level",
    "logger",
    "message",
    "app_name",
    "owner",
    "tags",
    "run_id",
    "trace_id",
];

/// Identity of one monitored run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// `YYYYmmdd_HHMMSS_<8 hex>`
    pub run_id: String,
    /// UUID v4
    pub trace_id: String,
}

impl RunIdentity {
    /// Fresh identity for a new run
    pub fn generate() -> Self {
        Self {
            run_id: generate_run_id(),
            trace_id: generate_trace_id(),
        }
    }

    pub fn new(run_id: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            trace_id: trace_id.into(),
        }
    }
}

/// Context stamped onto every record of a run
#[derive(Debug, Clone)]
pub struct RecordContext {
    pub app_name: String,
    pub owner: String,
    pub tags: Vec<String>,
    pub identity: RunIdentity,
}

impl RecordContext {
    /// Context for one run with its strings already redacted
    ///
    /// The run identity is generated by the pipeline and kept verbatim.
    pub fn new(config: &Config, redactor: &Redactor, identity: RunIdentity) -> Self {
        Self {
            app_name: redactor.redact(&config.app_name).into_owned(),
            owner: redactor.redact(&config.owner).into_owned(),
            tags: config
                .tags
                .iter()
                .map(|tag| redactor.redact(tag).into_owned())
                .collect(),
            identity,
        }
    }
}

/// One log event before serialization
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub logger: String,
    pub message: String,
    pub fields: Map<String, Value>,
}

impl LogRecord {
    /// Build a record stamped with the current time
    ///
    /// `fields` is expected to be a JSON object. `null` means no fields; any
    /// other value is kept under a `fields` key.
    pub fn new(
        level: LogLevel,
        logger: impl Into<String>,
        message: impl Into<String>,
        fields: Value,
    ) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("fields".to_string(), other);
                map
            }
        };

        Self {
            timestamp: Utc::now(),
            level,
            logger: logger.into(),
            message: message.into(),
            fields,
        }
    }

    /// RFC 3339 UTC timestamp with milliseconds and a `Z` suffix
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Serialize into a flat JSON object; reserved keys win over caller fields
    pub fn into_value(self, context: &RecordContext) -> Value {
        let timestamp = self.formatted_timestamp();
        let mut object = self.fields;
        object.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));

        object.insert("timestamp".to_string(), Value::String(timestamp));
        object.insert(
            "level".to_string(),
            Value::String(self.level.as_str().to_string()),
        );
        object.insert("logger".to_string(), Value::String(self.logger));
        object.insert("message".to_string(), Value::String(self.message));
        object.insert(
            "app_name".to_string(),
            Value::String(context.app_name.clone()),
        );
        object.insert("owner".to_string(), Value::String(context.owner.clone()));
        object.insert(
            "tags".to_string(),
            Value::Array(context.tags.iter().cloned().map(Value::String).collect()),
        );
        object.insert(
            "run_id".to_string(),
            Value::String(context.identity.run_id.clone()),
        );
        object.insert(
            "trace_id".to_string(),
            Value::String(context.identity.trace_id.clone()),
        );

        Value::Object(object)
    }
}
