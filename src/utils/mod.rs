//! Utility modules for dt-toolbox
//!
//! Small helpers shared by the configuration, logging, notification and storage
//! layers: identifiers, human-readable formatting and syntactic validation.

pub mod error; // Error handling

pub use error::{Result, ToolboxError};

use chrono::Utc;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use uuid::Uuid;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email regex is valid")
});

/// Generate a run identifier: `YYYYmmdd_HHMMSS_<8 hex chars>`
pub fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let unique = Uuid::new_v4().simple().to_string();
    format!("{}_{}", timestamp, &unique[..8])
}

/// Generate a trace identifier
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Format bytes as human readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: u64 = 1024;

    if bytes < THRESHOLD {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    format!("{:.1} {}", size, UNITS[unit_index])
}

/// Format duration as human readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        format!("{:.2}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.2}s", secs)
    } else if secs < 3600.0 {
        let minutes = (secs / 60.0).floor();
        format!("{}m {:.2}s", minutes as u64, secs - minutes * 60.0)
    } else {
        let hours = (secs / 3600.0).floor();
        let minutes = ((secs - hours * 3600.0) / 60.0).floor();
        format!(
            "{}h {}m {:.2}s",
            hours as u64,
            minutes as u64,
            secs - hours * 3600.0 - minutes * 60.0
        )
    }
}

/// Check if a string is a syntactically valid email address
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Check if a string is an absolute http(s) URL
pub fn is_valid_http_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

/// Truncate string to at most `max_len` bytes, ending with an ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut cut = max_len.saturating_sub(3);
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &s[..cut])
}

/// Keep a name usable as a single path component
///
/// Separators and other unusual characters become `_`; a name made only of
/// dots becomes `app`, so the result never climbs out of its parent.
pub fn sanitize_path_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.trim_matches('.') {
        "" => "app".to_string(),
        _ => cleaned,
    }
}
