//! S3 and MinIO archive over `object_store`

use crate::config::{StorageBackend, StorageConfig};
use crate::utils::error::{Result, ToolboxError};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::path::Path;
use tracing::debug;

/// Region used when none is configured; MinIO ignores it
const DEFAULT_REGION: &str = "us-east-1";

/// Bucket-backed archive for the s3 and minio backends
#[derive(Debug)]
pub struct ObjectStoreArchive {
    store: AmazonS3,
    bucket: String,
    endpoint: Option<String>,
}

impl ObjectStoreArchive {
    /// Build a client for `config.backend`, which must be s3 or minio
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| ToolboxError::Storage("bucket is not configured".to_string()))?;

        let mut builder = AmazonS3Builder::new().with_bucket_name(&bucket);
        let mut endpoint = None;

        match config.backend {
            StorageBackend::S3 => {
                builder = builder.with_region(
                    config.aws.region.as_deref().unwrap_or(DEFAULT_REGION),
                );
                if let Some(key_id) = &config.aws.access_key_id {
                    builder = builder.with_access_key_id(key_id);
                }
                if let Some(secret) = &config.aws.secret_access_key {
                    builder = builder.with_secret_access_key(secret);
                }
            }
            StorageBackend::Minio => {
                let url = config.minio.endpoint.clone().ok_or_else(|| {
                    ToolboxError::Storage("MinIO endpoint is not configured".to_string())
                })?;
                builder = builder
                    .with_region(DEFAULT_REGION)
                    .with_endpoint(&url)
                    .with_allow_http(true)
                    .with_virtual_hosted_style_request(false);
                if let Some(key_id) = &config.minio.access_key {
                    builder = builder.with_access_key_id(key_id);
                }
                if let Some(secret) = &config.minio.secret_key {
                    builder = builder.with_secret_access_key(secret);
                }
                endpoint = Some(url);
            }
            StorageBackend::Local => {
                return Err(ToolboxError::Storage(
                    "local backend does not use an object store".to_string(),
                ));
            }
        }

        let store = builder
            .build()
            .map_err(|e| ToolboxError::Storage(format!("failed to build S3 client: {}", e)))?;

        Ok(Self {
            store,
            bucket,
            endpoint,
        })
    }

    /// Upload `artifact` under `key` and return its URL
    pub async fn store(&self, artifact: &Path, key: &str) -> Result<String> {
        let bytes = tokio::fs::read(artifact).await.map_err(|e| {
            ToolboxError::Storage(format!("failed to read {}: {}", artifact.display(), e))
        })?;
        let size = bytes.len();

        self.store
            .put(&ObjectPath::from(key), PutPayload::from(bytes))
            .await
            .map_err(|e| ToolboxError::Storage(format!("upload to {} failed: {}", self.bucket, e)))?;

        debug!("Uploaded {} bytes to bucket {}", size, self.bucket);
        Ok(self.url(key))
    }

    /// Public location of `key`
    pub fn url(&self, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key),
            None => format!("s3://{}/{}", self.bucket, key),
        }
    }
}
