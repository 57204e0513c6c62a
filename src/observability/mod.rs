//! Run log observability
//!
//! Redaction, structured records, the file-backed pipeline and the `tracing`
//! capture layer. Nothing in here installs a global logger or subscriber.

pub mod layer;
pub mod pipeline;
pub mod record;
pub mod redaction;


pub use layer::PipelineLayer;
pub use pipeline::{LogHandle, LogPipeline, ROOT_LOGGER};
pub use record::{LogRecord, RecordContext, RunIdentity, RESERVED_KEYS};
pub use redaction::{Redactor, DEFAULT_PATTERNS};
