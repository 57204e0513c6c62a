//! # dt-toolbox
//!
//! Execution monitoring for data and ETL jobs.
//!
//! ## Features
//!
//! - **Layered configuration**: explicit overrides over `DTB_*` environment
//!   variables over a YAML file, resolved per field and validated up front
//! - **Structured run logs**: one JSON object per line, stamped with app, owner,
//!   tags and run identity
//! - **Redaction**: passwords, keys, SSNs and card numbers are rewritten before
//!   anything reaches disk
//! - **Failure capture**: returned errors and panics are logged with their type,
//!   message and stack representation, then handed back to the caller
//! - **Alerting**: email and Slack or Google Chat webhooks, isolated per channel
//! - **Archival**: large logs are copied to S3, MinIO or a local directory
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dt_toolbox::{monitor, ConfigOverrides};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let overrides = ConfigOverrides::new()
//!         .with_app_name("orders_etl")
//!         .with_owner("data-team@example.com")
//!         .with_tags(["finance", "daily"]);
//!
//!     let rows = monitor(overrides, |log| async move {
//!         log.info("extracting orders");
//!         Ok::<_, std::io::Error>(1200)
//!     })
//!     .await??;
//!
//!     println!("loaded {} rows", rows);
//!     Ok(())
//! }
//! ```
//!
//! ## Plain Initialization
//!
//! ```rust,no_run
//! use dt_toolbox::{init_monitoring, ConfigOverrides};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = init_monitoring(ConfigOverrides::new().with_app_name("orders_etl"))?;
//!     session.logger().info("starting");
//!     let report = session.finish().await;
//!     println!("{:?}", report.outcome());
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod monitoring;
pub mod observability;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::{Config, ConfigOverrides, ConfigResolver, EnvSnapshot};
pub use monitoring::notifications::{DeliveryStatus, DispatchReport, NotificationDispatcher};
pub use monitoring::{
    init_monitoring, monitor, monitor_blocking, CapturedError, ExecutionResult, Monitor,
    MonitorSession, Outcome, RunReport,
};
pub use observability::{LogHandle, LogPipeline, PipelineLayer, Redactor, RunIdentity};
pub use storage::{StorageUploader, UploadOutcome};
pub use utils::error::{Result, ToolboxError};

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    /// Unix seconds
    pub build_time: &'static str,
    pub git_hash: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: VERSION,
            build_time: option_env!("DTB_BUILD_TIME").unwrap_or("unknown"),
            git_hash: option_env!("DTB_GIT_HASH").unwrap_or("unknown"),
        }
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo::default()
}
