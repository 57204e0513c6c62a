//! Run log pipeline
//!
//! Every record is redacted, serialized to one JSON line and written with a
//! single `write_all` under a mutex to a `tracing-appender` rolling file, then
//! mirrored to stdout when console output is on.

use super::layer::PipelineLayer;
use super::record::{LogRecord, RecordContext, RunIdentity};
use super::redaction::Redactor;
use crate::config::{Config, LogLevel, LogRotation};
use crate::utils::error::{Result, ToolboxError};
use crate::utils::sanitize_path_component;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Logger name used when the caller does not pick one
pub const ROOT_LOGGER: &str = "root";

/// Entry point for starting a run log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPipeline;

impl LogPipeline {
    /// Open the sink under `<log_dir>/<app_name>/` and return a handle to it
    ///
    /// Failure to create the directory or open the file is a `ToolboxError::Sink`.
    pub fn start(config: Arc<Config>, identity: RunIdentity) -> Result<LogHandle> {
        let directory = config.log_dir.join(sanitize_path_component(&config.app_name));
        std::fs::create_dir_all(&directory).map_err(|e| {
            ToolboxError::Sink(format!(
                "failed to create log directory {}: {}",
                directory.display(),
                e
            ))
        })?;

        let appender = RollingFileAppender::builder()
            .rotation(rotation_for(config.log_rotation))
            .filename_prefix(identity.run_id.clone())
            .filename_suffix("log")
            .build(&directory)
            .map_err(|e| {
                ToolboxError::Sink(format!(
                    "failed to open log file in {}: {}",
                    directory.display(),
                    e
                ))
            })?;

        debug!(
            run_id = %identity.run_id,
            directory = %directory.display(),
            "Log pipeline started"
        );

        let redactor = Redactor::new(&config.redaction);
        let inner = Inner {
            context: RecordContext::new(&config, &redactor, identity),
            redactor,
            directory,
            sink: Mutex::new(Some(appender)),
            closed: AtomicBool::new(false),
            first_error: Mutex::new(None),
            records_written: AtomicU64::new(0),
            config,
        };

        Ok(LogHandle {
            inner: Arc::new(inner),
            logger: Arc::from(ROOT_LOGGER),
        })
    }
}

struct Inner {
    config: Arc<Config>,
    context: RecordContext,
    redactor: Redactor,
    directory: PathBuf,
    sink: Mutex<Option<RollingFileAppender>>,
    closed: AtomicBool,
    first_error: Mutex<Option<String>>,
    records_written: AtomicU64,
}

impl Inner {
    fn record_error(&self, error: String) {
        let mut slot = self.first_error.lock();
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    fn flush_sink(&self) {
        if let Some(writer) = self.sink.lock().as_mut() {
            if let Err(e) = writer.flush() {
                self.record_error(format!("failed to flush log file: {}", e));
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.flush_sink();
    }
}

/// Cheap, cloneable handle to a run log
///
/// Clones share the same sink. Records below the configured level are dropped;
/// records logged after [`LogHandle::close`] are discarded.
#[derive(Clone)]
pub struct LogHandle {
    inner: Arc<Inner>,
    logger: Arc<str>,
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle")
            .field("logger", &self.logger)
            .field("run_id", &self.inner.context.identity.run_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl LogHandle {
    /// Child handle writing under another logger name
    pub fn named(&self, logger: impl AsRef<str>) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            logger: Arc::from(logger.as_ref()),
        }
    }

    /// Logger name of this handle
    pub fn logger_name(&self) -> &str {
        &self.logger
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message, Value::Null);
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message, Value::Null);
    }

    pub fn warning(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warning, message, Value::Null);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message, Value::Null);
    }

    pub fn critical(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Critical, message, Value::Null);
    }

    pub fn debug_with(&self, message: impl AsRef<str>, fields: Value) {
        self.log(LogLevel::Debug, message, fields);
    }

    pub fn info_with(&self, message: impl AsRef<str>, fields: Value) {
        self.log(LogLevel::Info, message, fields);
    }

    pub fn warning_with(&self, message: impl AsRef<str>, fields: Value) {
        self.log(LogLevel::Warning, message, fields);
    }

    pub fn error_with(&self, message: impl AsRef<str>, fields: Value) {
        self.log(LogLevel::Error, message, fields);
    }

    pub fn critical_with(&self, message: impl AsRef<str>, fields: Value) {
        self.log(LogLevel::Critical, message, fields);
    }

    /// Write one record at `level` with structured `fields`
    pub fn log(&self, level: LogLevel, message: impl AsRef<str>, fields: Value) {
        self.log_as(&self.logger, level, message.as_ref(), fields);
    }

    /// Whether a record at `level` would be written
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.inner.config.log_level && !self.is_closed()
    }

    pub(crate) fn log_as(&self, logger: &str, level: LogLevel, message: &str, fields: Value) {
        if !self.enabled(level) {
            return;
        }

        // Run context was redacted once at start; run_id and trace_id never are
        let redactor = &self.inner.redactor;
        let mut fields = fields;
        redactor.redact_json_value(&mut fields);
        let record = LogRecord::new(
            level,
            redactor.redact(logger),
            redactor.redact(message),
            fields,
        );
        self.write_line(&record.into_value(&self.inner.context));
    }

    fn write_line(&self, value: &Value) {
        let mut line = match serde_json::to_string(value) {
            Ok(line) => line,
            Err(e) => {
                self.inner
                    .record_error(format!("failed to serialize record: {}", e));
                return;
            }
        };
        line.push('\n');

        {
            let mut sink = self.inner.sink.lock();
            let Some(writer) = sink.as_mut() else {
                return;
            };
            if let Err(e) = writer.write_all(line.as_bytes()).and_then(|_| writer.flush()) {
                self.inner
                    .record_error(format!("failed to write log record: {}", e));
                return;
            }
        }
        self.inner.records_written.fetch_add(1, Ordering::Relaxed);

        if self.inner.config.console {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            // Console mirroring is best effort
            let _ = out.write_all(line.as_bytes());
        }
    }

    /// Flush buffered output to the file
    pub fn flush(&self) {
        self.inner.flush_sink();
    }

    /// Flush and release the file; later records are discarded
    ///
    /// Returns the first write error seen during the run, once. Calling `close`
    /// again is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.inner.flush_sink();
        let released = self.inner.sink.lock().take();
        drop(released);

        debug!(
            run_id = %self.inner.context.identity.run_id,
            records = self.records_written(),
            "Log pipeline closed"
        );

        match self.sink_error() {
            Some(error) => {
                warn!("Run log had write failures: {}", error);
                Err(ToolboxError::Sink(error))
            }
            None => Ok(()),
        }
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// First write error recorded, if any
    pub fn sink_error(&self) -> Option<String> {
        self.inner.first_error.lock().clone()
    }

    /// Number of records written to the file so far
    pub fn records_written(&self) -> u64 {
        self.inner.records_written.load(Ordering::Relaxed)
    }

    /// Path of the file currently receiving records
    pub fn artifact_path(&self) -> PathBuf {
        let run_id = &self.inner.context.identity.run_id;
        let file_name = match self.inner.config.log_rotation {
            LogRotation::Never => format!("{}.log", run_id),
            LogRotation::Hourly => {
                format!("{}.{}.log", run_id, Utc::now().format("%Y-%m-%d-%H"))
            }
            LogRotation::Daily => format!("{}.{}.log", run_id, Utc::now().format("%Y-%m-%d")),
        };
        self.inner.directory.join(file_name)
    }

    /// Directory holding this run's files
    pub fn directory(&self) -> &Path {
        &self.inner.directory
    }

    /// Identity stamped on every record
    pub fn identity(&self) -> &RunIdentity {
        &self.inner.context.identity
    }

    /// Configuration the pipeline was started with
    pub fn config(&self) -> &Arc<Config> {
        &self.inner.config
    }

    /// Redactor applied to every record
    pub fn redactor(&self) -> &Redactor {
        &self.inner.redactor
    }

    /// `tracing` layer that feeds events into this run log
    pub fn layer(&self) -> PipelineLayer {
        PipelineLayer::new(self.clone())
    }
}

fn rotation_for(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Never => Rotation::NEVER,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
    }
}
