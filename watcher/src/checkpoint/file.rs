//! JSON file checkpoint store.
//!
//! Saves go through a temporary sibling file that is flushed to disk and
//! then renamed over the target, so a crash mid-write leaves the previous
//! checkpoint readable.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{decode, encode, Checkpoint, CheckpointStore, PersistenceError};

/// Checkpoint store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Creates a store for the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the checkpoint path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the temporary path used during saves.
    #[must_use]
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map_or_else(|| OsString::from("checkpoint"), |n| n.to_os_string());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
        move |source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> Result<Checkpoint, PersistenceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => decode(&self.path, &bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No checkpoint at {}, starting uninitialized", self.path.display());
                Ok(Checkpoint::default())
            }
            Err(e) => Err(Self::io_error(&self.path)(e)),
        }
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        let bytes = encode(checkpoint)?;
        let temp = self.temp_path();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(Self::io_error(parent))?;
        }

        let mut file = tokio::fs::File::create(&temp)
            .await
            .map_err(Self::io_error(&temp))?;
        file.write_all(&bytes)
            .await
            .map_err(Self::io_error(&temp))?;
        file.sync_all().await.map_err(Self::io_error(&temp))?;
        drop(file);

        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(Self::io_error(&self.path))?;

        sync_parent_dir(&self.path).await;
        Ok(())
    }
}

/// Flushes the directory entry for a renamed file.
#[cfg(unix)]
async fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let synced = match tokio::fs::File::open(parent).await {
        Ok(dir) => dir.sync_all().await,
        Err(e) => Err(e),
    };
    if let Err(e) = synced {
        debug!("Could not sync {}: {}", parent.display(), e);
    }
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) {}
