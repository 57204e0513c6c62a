//! Custom assertions for run logs

use super::fixtures::{APP_NAME, OWNER};
use serde_json::Value;
use std::path::Path;

/// Assert that a record carries the run context every line must have
pub fn assert_context(record: &Value) {
    for key in ["timestamp", "level", "message", "app_name", "owner", "tags"] {
        assert!(record.get(key).is_some(), "missing `{}` in {}", key, record);
    }
    assert_eq!(record["app_name"], APP_NAME);
    assert_eq!(record["owner"], OWNER);
}

/// Assert that the raw log file never contains `needle`
pub fn assert_no_substring(path: &Path, needle: &str) {
    let raw = std::fs::read_to_string(path).expect("read run log");
    assert!(
        !raw.contains(needle),
        "`{}` leaked into {}",
        needle,
        path.display()
    );
}
