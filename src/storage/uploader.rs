//! Conditional upload of the log artifact

use super::local::LocalArchive;
#[cfg(feature = "s3")]
use super::s3::ObjectStoreArchive;
use super::types::UploadOutcome;
use crate::config::{Config, StorageBackend, StorageConfig};
use crate::utils::error::{Result, ToolboxError};
use crate::utils::{format_bytes, sanitize_path_component};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, info, warn};

/// Archive backend selected by configuration
#[derive(Debug)]
pub enum ArchiveBackend {
    Local(LocalArchive),
    #[cfg(feature = "s3")]
    ObjectStore(ObjectStoreArchive),
}

impl ArchiveBackend {
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            StorageBackend::Local => Ok(Self::Local(LocalArchive::new(config.local_path.clone()))),
            #[cfg(feature = "s3")]
            StorageBackend::S3 | StorageBackend::Minio => {
                Ok(Self::ObjectStore(ObjectStoreArchive::from_config(config)?))
            }
            #[cfg(not(feature = "s3"))]
            backend => Err(ToolboxError::Storage(format!(
                "{} backend requires the `s3` feature",
                backend.as_str()
            ))),
        }
    }

    /// Store `artifact` under `key`, returning its location
    pub async fn store(&self, artifact: &Path, key: &str) -> Result<String> {
        match self {
            Self::Local(archive) => archive
                .store(artifact, key)
                .await
                .map(|path| path.display().to_string()),
            #[cfg(feature = "s3")]
            Self::ObjectStore(archive) => archive.store(artifact, key).await,
        }
    }
}

/// Remote key `<prefix>/<app_name>/<UTC timestamp>_<file name>`; an empty
/// prefix is left out. `app_name` is cleaned the same way as the log directory.
pub fn archive_key(prefix: &str, app_name: &str, at: DateTime<Utc>, file_name: &str) -> String {
    let app_name = sanitize_path_component(app_name);
    let stamped = format!("{}_{}", at.format("%Y%m%dT%H%M%SZ"), file_name);
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}/{}", app_name, stamped)
    } else {
        format!("{}/{}/{}", prefix, app_name, stamped)
    }
}

/// Archives the log artifact once it outgrows the configured threshold
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageUploader;

impl StorageUploader {
    /// Upload `artifact` when storage is enabled and the file is strictly
    /// larger than the threshold. Never fails: errors become `Failed`.
    pub async fn maybe_upload(config: &Config, artifact: &Path) -> UploadOutcome {
        let storage = &config.storage;
        if !storage.enabled {
            return UploadOutcome::not_attempted("storage is disabled");
        }

        let size = match tokio::fs::metadata(artifact).await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                let reason = format!("cannot stat {}: {}", artifact.display(), e);
                warn!("Log archival failed: {}", reason);
                return UploadOutcome::failed(reason);
            }
        };

        let threshold = storage.threshold_bytes();
        if size <= threshold {
            debug!(
                "Log artifact is {}, not above the {} threshold",
                format_bytes(size),
                format_bytes(threshold)
            );
            return UploadOutcome::not_attempted(format!(
                "artifact size {} bytes does not exceed threshold {} bytes",
                size, threshold
            ));
        }

        let file_name = artifact
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "run.log".to_string());
        let key = archive_key(&storage.prefix, &config.app_name, Utc::now(), &file_name);

        match Self::upload(storage, artifact, &key).await {
            Ok(url) => {
                info!(
                    "Archived log artifact ({}) to {} via {}",
                    format_bytes(size),
                    url,
                    storage.backend.as_str()
                );
                UploadOutcome::Uploaded { key, url }
            }
            Err(e) => {
                warn!("Log archival failed: {}", e);
                UploadOutcome::failed(e.to_string())
            }
        }
    }

    async fn upload(storage: &StorageConfig, artifact: &Path, key: &str) -> Result<String> {
        let backend = ArchiveBackend::from_config(storage)?;

        tokio::time::timeout(storage.timeout(), backend.store(artifact, key))
            .await
            .map_err(|_| {
                ToolboxError::Timeout(format!(
                    "upload did not finish within {}s",
                    storage.timeout_secs
                ))
            })?
    }
}
