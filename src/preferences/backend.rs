//! Storage backends for the preference record

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::model::CameraPreferences;

/// Errors reading or writing the preference record. Never leave the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("preference I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("preference record is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

/// Durable home of the preference record
#[async_trait]
pub trait PreferenceBackend: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet
    async fn read(&self) -> Result<Option<CameraPreferences>, StoreError>;

    /// Overwrite the stored record
    async fn write(&self, preferences: &CameraPreferences) -> Result<(), StoreError>;
}

/// JSON file backend. Writes go to a sibling temp file that is renamed
/// over the record, so readers never see a torn write.
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PreferenceBackend for FilePreferences {
    async fn read(&self) -> Result<Option<CameraPreferences>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn write(&self, preferences: &CameraPreferences) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(preferences)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
