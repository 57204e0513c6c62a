//! Log archival configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Object storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Minio,
    #[default]
    Local,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::S3 => "s3",
            StorageBackend::Minio => "minio",
            StorageBackend::Local => "local",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "minio" => Ok(StorageBackend::Minio),
            "local" => Ok(StorageBackend::Local),
            other => Err(format!(
                "unsupported storage backend '{}', expected s3, minio or local",
                other
            )),
        }
    }
}

/// AWS credentials for the S3 backend
#[derive(Debug, Clone, Default, Serialize)]
pub struct AwsCredentials {
    pub access_key_id: Option<String>,
    #[serde(serialize_with = "serialize_masked")]
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
}

/// Connection settings for the MinIO backend
#[derive(Debug, Clone, Default, Serialize)]
pub struct MinioConfig {
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    #[serde(serialize_with = "serialize_masked")]
    pub secret_key: Option<String>,
}

/// Log archival configuration
#[derive(Debug, Clone, Serialize)]
pub struct StorageConfig {
    /// Archive logs at all
    pub enabled: bool,
    /// Backend kind
    pub backend: StorageBackend,
    /// Bucket for s3 and minio
    pub bucket: Option<String>,
    /// Remote key prefix
    pub prefix: String,
    /// Upload only artifacts strictly larger than this many kilobytes
    pub upload_threshold_kb: u64,
    /// S3 credentials
    pub aws: AwsCredentials,
    /// MinIO connection settings
    pub minio: MinioConfig,
    /// Archive directory for the local backend
    pub local_path: PathBuf,
    /// Time budget for one upload, in seconds
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: StorageBackend::default(),
            bucket: None,
            prefix: default_storage_prefix(),
            upload_threshold_kb: default_upload_threshold_kb(),
            aws: AwsCredentials::default(),
            minio: MinioConfig::default(),
            local_path: default_local_archive_path(),
            timeout_secs: default_storage_timeout(),
        }
    }
}

impl StorageConfig {
    /// Threshold expressed in bytes
    pub fn threshold_bytes(&self) -> u64 {
        self.upload_threshold_kb.saturating_mul(1024)
    }

    /// Time budget for one upload
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
