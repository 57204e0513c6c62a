//! Plain-initialization mode
//!
//! For scripts that cannot be wrapped in a single closure: start a session,
//! log through its handle, and finish it explicitly. Nothing is re-raised;
//! the caller keeps responsibility for its own errors.

use super::orchestrator::{finalize, record_execution, Monitor, FAILURE_MESSAGE};
use super::types::{panic_message, CapturedError, ExecutionResult, RunReport};
use crate::config::{Config, ConfigOverrides};
use crate::observability::LogHandle;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Resolve configuration from `overrides`, the environment and the default
/// config file, and open the run log
pub fn init_monitoring(overrides: ConfigOverrides) -> Result<MonitorSession> {
    MonitorSession::start(&Monitor::new(overrides))
}

/// An open monitored run
///
/// Dropping a session without finishing it closes the log but sends no
/// notification and archives nothing.
#[derive(Debug)]
pub struct MonitorSession {
    handle: LogHandle,
    started_at: DateTime<Utc>,
    finished: bool,
}

impl MonitorSession {
    pub fn start(monitor: &Monitor) -> Result<Self> {
        let handle = monitor.start()?;
        handle.info_with(
            "Execution started",
            json!({
                "run_id": handle.identity().run_id,
                "trace_id": handle.identity().trace_id,
            }),
        );

        Ok(Self {
            handle,
            started_at: Utc::now(),
            finished: false,
        })
    }

    /// Handle for logging during the run
    pub fn logger(&self) -> &LogHandle {
        &self.handle
    }

    pub fn config(&self) -> &Arc<Config> {
        self.handle.config()
    }

    /// Finish a successful run
    pub async fn finish(self) -> RunReport {
        self.complete(None).await
    }

    /// Finish a run that failed with `error`
    pub async fn finish_with_error<E>(self, error: &E) -> RunReport
    where
        E: fmt::Display + fmt::Debug + ?Sized,
    {
        self.complete(Some(CapturedError::from_error(error))).await
    }

    /// Finish with the outcome of `result`
    pub async fn finish_result<T, E>(self, result: &std::result::Result<T, E>) -> RunReport
    where
        E: fmt::Display + fmt::Debug,
    {
        match result {
            Ok(_) => self.finish().await,
            Err(e) => self.finish_with_error(e).await,
        }
    }

    /// Record panics into this run log before the previous hook runs
    ///
    /// The hook stays installed for the rest of the process and writes nothing
    /// once the session is closed.
    pub fn install_panic_hook(&self) {
        let handle = self.handle.clone();
        let previous = std::panic::take_hook();

        std::panic::set_hook(Box::new(move |info| {
            let message = panic_message(info.payload());
            let location = info
                .location()
                .map(|location| location.to_string())
                .unwrap_or_else(|| "unknown".to_string());

            handle.critical_with(
                FAILURE_MESSAGE,
                json!({
                    "error_type": "panic",
                    "error_message": message,
                    "stacktrace": format!("panicked at {}: {}", location, message),
                    "panicked": true,
                }),
            );
            handle.flush();
            previous(info);
        }));
    }

    async fn complete(mut self, error: Option<CapturedError>) -> RunReport {
        self.finished = true;
        let finished_at = Utc::now();
        let execution = match error {
            None => ExecutionResult::success(self.started_at, finished_at),
            Some(error) => ExecutionResult::failure(self.started_at, finished_at, error),
        };

        record_execution(&self.handle, &execution);
        let config = Arc::clone(self.handle.config());
        finalize(&config, &self.handle, execution).await
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(
            run_id = %self.handle.identity().run_id,
            "Monitoring session dropped without finish; closing the run log"
        );
        if let Err(e) = self.handle.close() {
            warn!("Run log closed with errors: {}", e);
        }
    }
}
