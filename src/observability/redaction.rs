//! Sensitive data redaction for run logs
//!
//! This module rewrites sensitive substrings before anything is persisted,
//! preventing passwords, keys and personal numbers from reaching the log artifact.
//!
//! All patterns are matched against the original text and the matched spans are
//! merged before replacement, so the order of patterns never matters and one
//! pattern's replacement cannot hide text another pattern would have matched.

use crate::config::models::RedactionConfig;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;

/// Built-in patterns, always applied unless redaction is disabled
pub const DEFAULT_PATTERNS: &[&str] = &[
    // Password assignments
    r#"password['"]?\s*[:=]\s*['"]?[\w!@#$%^&*()]+"#,
    // API key assignments
    r#"api[_-]?key['"]?\s*[:=]\s*['"]?[\w-]+"#,
    // Secret assignments
    r#"secret['"]?\s*[:=]\s*['"]?[\w-]+"#,
    // SSN
    r"\b\d{3}-\d{2}-\d{4}\b",
    // Payment card, 13 to 19 digits
    r"\b\d(?:[ -]?\d){12,18}\b",
];

/// Applies the configured patterns to text and JSON payloads
#[derive(Debug, Clone)]
pub struct Redactor {
    enabled: bool,
    patterns: Vec<Regex>,
    replacement: String,
}

impl Redactor {
    /// Build a redactor from compiled configuration
    pub fn new(config: &RedactionConfig) -> Self {
        Self {
            enabled: config.enabled,
            patterns: config.patterns.clone(),
            replacement: config.replacement.clone(),
        }
    }

    /// Redactor that returns its input unchanged
    pub fn disabled() -> Self {
        Self::new(&RedactionConfig::disabled())
    }

    /// Whether any rewriting can happen
    pub fn is_active(&self) -> bool {
        self.enabled && !self.patterns.is_empty()
    }

    /// Redact sensitive substrings from free text
    pub fn redact<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !self.is_active() || text.is_empty() {
            return Cow::Borrowed(text);
        }

        let mut spans: Vec<(usize, usize)> = self
            .patterns
            .iter()
            .flat_map(|pattern| pattern.find_iter(text).map(|m| (m.start(), m.end())))
            .filter(|(start, end)| end > start)
            .collect();

        if spans.is_empty() {
            return Cow::Borrowed(text);
        }

        spans.sort_unstable();
        let merged = merge_spans(spans);

        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        for (start, end) in merged {
            result.push_str(&text[cursor..start]);
            result.push_str(&self.replacement);
            cursor = end;
        }
        result.push_str(&text[cursor..]);

        Cow::Owned(result)
    }

    /// Redact every string leaf of a JSON value, returning a new value
    pub fn redact_structured(&self, value: &Value) -> Value {
        let mut value = value.clone();
        self.redact_json_value(&mut value);
        value
    }

    /// Redact every string leaf of a JSON value in place
    ///
    /// Object keys, numbers, booleans and null are left untouched.
    pub fn redact_json_value(&self, value: &mut Value) {
        if !self.is_active() {
            return;
        }

        match value {
            Value::String(text) => {
                if let Cow::Owned(redacted) = self.redact(text) {
                    *text = redacted;
                }
            }
            Value::Object(map) => {
                for val in map.values_mut() {
                    self.redact_json_value(val);
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.redact_json_value(item);
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(&RedactionConfig::default())
    }
}

/// Merge sorted, possibly overlapping or touching spans
fn merge_spans(spans: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}
