//! Log archival
//!
//! After a run finishes, the log artifact is copied to object storage when it
//! has grown past the configured threshold. Archival is best effort: every
//! failure ends up in an [`UploadOutcome`] and never reaches the caller.

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;
pub mod types;
pub mod uploader;


pub use local::LocalArchive;
#[cfg(feature = "s3")]
pub use s3::ObjectStoreArchive;
pub use types::UploadOutcome;
pub use uploader::{archive_key, ArchiveBackend, StorageUploader};
