//! Run monitoring
//!
//! This module ties configuration, the run log, notifications and archival
//! together around one unit of work.

pub mod notifications;
pub mod orchestrator;
pub mod session;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public types
pub use orchestrator::{monitor, monitor_blocking, Monitor, FAILURE_MESSAGE};
pub use session::{init_monitoring, MonitorSession};
pub use types::{CapturedError, ExecutionResult, Outcome, RunReport, RunState};
