//! Monitored execution
//!
//! [`Monitor`] drives one run through
//! `Configuring -> Running -> Succeeded | Failed -> Finalizing -> Done`:
//! resolve configuration, open the run log, execute the work, record any
//! failure, then close the log, notify and archive. Configuration and sink
//! errors abort before the work starts. Notification and archival problems
//! only ever show up in the [`RunReport`].

use super::notifications::{DispatchReport, NotificationDispatcher};
use super::types::{panic_message, CapturedError, ExecutionResult, Outcome, RunReport, RunState};
use crate::config::{Config, ConfigOverrides, ConfigResolver, EnvSnapshot};
use crate::observability::{LogHandle, LogPipeline, RunIdentity};
use crate::storage::{StorageUploader, UploadOutcome};
use crate::utils::error::Result;
use crate::utils::format_duration;
use chrono::Utc;
use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;

/// Message of the record written when the work fails
pub const FAILURE_MESSAGE: &str = "Uncaught failure";

/// How the work ended, before finalization
enum Completion<T, E> {
    Returned(std::result::Result<T, E>),
    Panicked(Box<dyn Any + Send>),
}

/// Entry point for monitored runs
///
/// Holds the explicit overrides plus the optional config file path and
/// environment. Each call to [`Monitor::run`] resolves its own configuration
/// and owns its own log file, so one `Monitor` can drive many runs,
/// concurrently if needed.
#[derive(Debug, Clone, Default)]
pub struct Monitor {
    overrides: ConfigOverrides,
    config_file: Option<PathBuf>,
    env: Option<EnvSnapshot>,
}

impl Monitor {
    pub fn new(overrides: ConfigOverrides) -> Self {
        Self {
            overrides,
            config_file: None,
            env: None,
        }
    }

    /// Read the YAML file at `path` instead of `~/.dt_toolbox/config.yml`
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Resolve against `env` instead of the process environment
    pub fn with_env(mut self, env: EnvSnapshot) -> Self {
        self.env = Some(env);
        self
    }

    /// Merge every source into a validated configuration
    pub fn resolve_config(&self) -> Result<Config> {
        let file = self.config_file.as_deref();
        match &self.env {
            Some(env) => ConfigResolver::resolve(file, env, &self.overrides),
            None => ConfigResolver::resolve_from_process(file, &self.overrides),
        }
    }

    /// Resolve configuration and open the run log
    pub fn start(&self) -> Result<LogHandle> {
        let config = Arc::new(self.resolve_config()?);
        LogPipeline::start(config, RunIdentity::generate())
    }

    /// Run `work` under monitoring
    ///
    /// The outer `Result` carries configuration and sink errors, in which case
    /// `work` never ran. The inner one is the work's own result, returned
    /// unchanged after finalization. A panic in `work` is logged and reported,
    /// then resumed once finalization is done.
    pub async fn run<F, Fut, T, E>(&self, work: F) -> Result<std::result::Result<T, E>>
    where
        F: FnOnce(LogHandle) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display + fmt::Debug,
    {
        let (result, _report) = self.run_with_report(work).await?;
        Ok(result)
    }

    /// Like [`Monitor::run`], also returning what finalization did
    pub async fn run_with_report<F, Fut, T, E>(
        &self,
        work: F,
    ) -> Result<(std::result::Result<T, E>, RunReport)>
    where
        F: FnOnce(LogHandle) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display + fmt::Debug,
    {
        let mut state = StateTracker::default();
        let handle = self.start()?;
        let config = Arc::clone(handle.config());

        state.advance(RunState::Running);
        let started_at = Utc::now();
        handle.info_with(
            "Execution started",
            json!({
                "run_id": handle.identity().run_id,
                "trace_id": handle.identity().trace_id,
            }),
        );

        // The closure is called inside the guarded future so a panic raised
        // before its first await is captured too
        let work_handle = handle.clone();
        let future = async move { work(work_handle).await };
        let completion = if config.capture_tracing {
            let subscriber = tracing_subscriber::registry().with(handle.layer());
            AssertUnwindSafe(future.with_subscriber(subscriber))
                .catch_unwind()
                .await
        } else {
            AssertUnwindSafe(future).catch_unwind().await
        };
        let completion = match completion {
            Ok(result) => Completion::Returned(result),
            Err(payload) => Completion::Panicked(payload),
        };
        let finished_at = Utc::now();

        let execution = match &completion {
            Completion::Returned(Ok(_)) => ExecutionResult::success(started_at, finished_at),
            Completion::Returned(Err(e)) => {
                ExecutionResult::failure(started_at, finished_at, CapturedError::from_error(e))
            }
            Completion::Panicked(payload) => ExecutionResult::failure(
                started_at,
                finished_at,
                CapturedError::from_panic(payload.as_ref(), None),
            ),
        };
        state.advance(match execution.outcome {
            Outcome::Success => RunState::Succeeded,
            Outcome::Failure => RunState::Failed,
        });

        record_execution(&handle, &execution);

        state.advance(RunState::Finalizing);
        let report = finalize(&config, &handle, execution).await;
        state.advance(RunState::Done);

        match completion {
            Completion::Returned(result) => Ok((result, report)),
            Completion::Panicked(payload) => panic::resume_unwind(payload),
        }
    }

    /// Blocking variant of [`Monitor::run`] for synchronous work
    ///
    /// Drives the run on a private current-thread runtime, so it must not be
    /// called from inside an async context.
    pub fn run_blocking<F, T, E>(&self, work: F) -> Result<std::result::Result<T, E>>
    where
        F: FnOnce(LogHandle) -> std::result::Result<T, E>,
        E: fmt::Display + fmt::Debug,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run(|log| async move { work(log) }))
    }
}

/// Run `work` with `overrides` on top of the environment and default file
pub async fn monitor<F, Fut, T, E>(
    overrides: ConfigOverrides,
    work: F,
) -> Result<std::result::Result<T, E>>
where
    F: FnOnce(LogHandle) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: fmt::Display + fmt::Debug,
{
    Monitor::new(overrides).run(work).await
}

/// Blocking form of [`monitor`]
pub fn monitor_blocking<F, T, E>(
    overrides: ConfigOverrides,
    work: F,
) -> Result<std::result::Result<T, E>>
where
    F: FnOnce(LogHandle) -> std::result::Result<T, E>,
    E: fmt::Display + fmt::Debug,
{
    Monitor::new(overrides).run_blocking(work)
}

/// Write the closing record of the work into the run log
pub(crate) fn record_execution(handle: &LogHandle, execution: &ExecutionResult) {
    let duration = format_duration(execution.duration());
    match &execution.error {
        None => handle.info_with(
            "Execution completed successfully",
            json!({ "duration": duration, "status": execution.outcome }),
        ),
        Some(failure) => handle.critical_with(
            FAILURE_MESSAGE,
            json!({
                "error_type": failure.type_name,
                "error_message": failure.message,
                "stacktrace": failure.stack,
                "panicked": failure.panicked,
                "duration": duration,
                "status": execution.outcome,
            }),
        ),
    }
}

/// Close the log, then notify, then archive
///
/// Each step runs even if the one before it failed or panicked.
pub(crate) async fn finalize(
    config: &Config,
    handle: &LogHandle,
    execution: ExecutionResult,
) -> RunReport {
    let artifact = handle.artifact_path();

    let sink_error = match handle.close() {
        Ok(()) => None,
        Err(e) => {
            warn!("Run log closed with errors: {}", e);
            Some(e.to_string())
        }
    };

    let dispatch = AssertUnwindSafe(async {
        NotificationDispatcher::from_config(config)
            .dispatch(config, &execution, handle.identity(), Some(artifact.as_path()))
            .await
    })
    .catch_unwind()
    .await
    .unwrap_or_else(|payload| {
        error!(
            "Notification dispatch panicked: {}",
            panic_message(payload.as_ref())
        );
        DispatchReport::default()
    });

    let upload = AssertUnwindSafe(StorageUploader::maybe_upload(config, &artifact))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            UploadOutcome::failed(format!(
                "uploader panicked: {}",
                panic_message(payload.as_ref())
            ))
        });

    info!(
        app_name = %config.app_name,
        run_id = %handle.identity().run_id,
        outcome = %execution.outcome,
        delivered = dispatch.delivered_count(),
        failed = dispatch.failed_count(),
        uploaded = upload.is_uploaded(),
        "Run finalized"
    );

    RunReport {
        identity: handle.identity().clone(),
        execution,
        dispatch,
        upload,
        artifact,
        sink_error,
    }
}

/// Tracks the run lifecycle and flags illegal transitions
#[derive(Debug)]
struct StateTracker {
    state: RunState,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self {
            state: RunState::Configuring,
        }
    }
}

impl StateTracker {
    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal run transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("Run state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
