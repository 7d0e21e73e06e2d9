//! Persisted watermark: the highest topic ID already announced.
//!
//! The record is a one-field JSON object, `{"last_topic_id": 123}`. A missing
//! file means the job has never run against this state location.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("watermark file {path} is corrupt")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O error on watermark file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct WatermarkRecord {
    last_topic_id: u64,
}

/// File-backed watermark store.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a record has ever been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file system cannot be queried.
    pub async fn exists(&self) -> Result<bool, StateError> {
        tokio::fs::try_exists(&self.path)
            .await
            .map_err(|source| self.io_error(source))
    }

    /// Read the stored watermark, or `0` if no record exists.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Corrupt`] if the record exists but does not
    /// hold a single non-negative integer `last_topic_id`.
    pub async fn load(&self) -> Result<u64, StateError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(self.io_error(e)),
        };

        let record: WatermarkRecord =
            serde_json::from_slice(&bytes).map_err(|source| StateError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        Ok(record.last_topic_id)
    }

    /// Replace the stored watermark.
    ///
    /// The record is written to a sibling temp file and renamed into place,
    /// so readers see either the old record or the new one. On Unix the
    /// containing directory is synced afterwards so the rename itself is
    /// durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written or moved into place.
    pub async fn save(&self, last_topic_id: u64) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let body = serde_json::to_vec(&WatermarkRecord { last_topic_id })
            .map_err(|e| self.io_error(e.into()))?;

        let tmp_path = self.tmp_path();
        let write = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(&body).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp_path, &self.path).await?;
            sync_dir(&self.dir()).await
        };

        if let Err(source) = write.await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(self.io_error(source));
        }

        debug!(path = %self.path.display(), last_topic_id, "Saved watermark");
        Ok(())
    }

    fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
