//! Local filesystem archive

use crate::utils::error::{Result, ToolboxError};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Archive rooted at a local directory; keys map to relative paths
#[derive(Debug, Clone)]
pub struct LocalArchive {
    base_path: PathBuf,
}

impl LocalArchive {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Copy `artifact` to `<base>/<key>` and return the destination
    ///
    /// Keys must be relative paths of plain components; anything that could
    /// resolve outside the base directory is rejected.
    pub async fn store(&self, artifact: &Path, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if key.is_empty() || !plain {
            return Err(ToolboxError::Storage(format!(
                "archive key '{}' is not a plain relative path",
                key
            )));
        }
        let destination = self.base_path.join(relative);

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ToolboxError::Storage(format!(
                    "failed to create archive directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let bytes = fs::copy(artifact, &destination).await.map_err(|e| {
            ToolboxError::Storage(format!(
                "failed to copy {} to {}: {}",
                artifact.display(),
                destination.display(),
                e
            ))
        })?;

        debug!("Archived {} bytes to {}", bytes, destination.display());
        Ok(destination)
    }
}
