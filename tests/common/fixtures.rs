//! Test fixtures

use dt_toolbox::config::LogLevel;
use dt_toolbox::{ConfigOverrides, EnvSnapshot, Monitor};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const APP_NAME: &str = "etl_orders";
pub const OWNER: &str = "owner@example.com";

/// Temporary workspace for one monitored run
pub struct TestRun {
    pub dir: TempDir,
    pub env: EnvSnapshot,
}

impl TestRun {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
            env: EnvSnapshot::empty(),
        }
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env = self.env.with_var(key, value);
        self
    }

    pub fn log_dir(&self) -> PathBuf {
        self.dir.path().join("logs")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.dir.path().join("archive")
    }

    /// Minimal valid overrides writing under this run's directory
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides::new()
            .with_app_name(APP_NAME)
            .with_owner(OWNER)
            .with_tags(["orders", "nightly"])
            .with_log_dir(self.log_dir())
            .with_log_level(LogLevel::Debug)
            .with_console(false)
    }

    pub fn monitor(&self, overrides: ConfigOverrides) -> Monitor {
        Monitor::new(overrides).with_env(self.env.clone())
    }

    /// Write `content` to a config file inside the run directory
    pub fn config_file(&self, content: &str) -> PathBuf {
        let path = self.dir.path().join("config.yml");
        std::fs::write(&path, content).expect("write config file");
        path
    }
}

impl Default for TestRun {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse every line of a run log
pub fn read_records(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .expect("read run log")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is JSON"))
        .collect()
}
