//! Redaction configuration
//!
//! Patterns are compiled while the configuration is built, so a bad pattern is a
//! configuration error rather than a surprise on the first log line.

use super::*;
use crate::observability::redaction::DEFAULT_PATTERNS;
use crate::utils::error::{Result, ToolboxError};
use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};

/// Redaction configuration with compiled patterns
#[derive(Debug, Clone, Serialize)]
pub struct RedactionConfig {
    /// Apply redaction at all
    pub enabled: bool,
    /// Built-in patterns followed by user patterns, in order
    #[serde(serialize_with = "serialize_patterns")]
    pub patterns: Vec<Regex>,
    /// Literal written in place of every match
    pub replacement: String,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        // Built-in patterns are constants covered by tests
        Self::compile(true, &[], default_replacement())
            .unwrap_or_else(|_| Self::disabled())
    }
}

impl RedactionConfig {
    /// Compile the built-in patterns followed by `extra_patterns`
    pub fn compile(
        enabled: bool,
        extra_patterns: &[String],
        replacement: impl Into<String>,
    ) -> Result<Self> {
        let mut patterns = Vec::with_capacity(DEFAULT_PATTERNS.len() + extra_patterns.len());

        for pattern in DEFAULT_PATTERNS {
            patterns.push(compile_pattern(pattern).map_err(|e| {
                ToolboxError::config("redaction.patterns", format!("built-in pattern: {}", e))
            })?);
        }

        for (index, pattern) in extra_patterns.iter().enumerate() {
            let regex = compile_pattern(pattern).map_err(|e| {
                ToolboxError::config(format!("redaction.patterns[{}]", index), e.to_string())
            })?;
            patterns.push(regex);
        }

        Ok(Self {
            enabled,
            patterns,
            replacement: replacement.into(),
        })
    }

    /// Identity configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            patterns: Vec::new(),
            replacement: default_replacement(),
        }
    }

    /// Number of user-supplied patterns on top of the built-ins
    pub fn user_pattern_count(&self) -> usize {
        self.patterns.len().saturating_sub(DEFAULT_PATTERNS.len())
    }
}

fn compile_pattern(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

fn serialize_patterns<S>(patterns: &[Regex], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(patterns.iter().map(Regex::as_str))
}
