//! In-memory checkpoint store.
//!
//! Holds the encoded record rather than the struct so that loads go through
//! the same decode path as the file store.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{decode, encode, Checkpoint, CheckpointStore, PersistenceError};

const MEMORY_PATH: &str = "<memory>";

/// Checkpoint store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    record: Mutex<Option<Vec<u8>>>,
    unavailable: AtomicBool,
    saves: AtomicU64,
}

impl MemoryCheckpointStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `checkpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be encoded.
    pub fn with_checkpoint(checkpoint: &Checkpoint) -> Result<Self, PersistenceError> {
        Ok(Self {
            record: Mutex::new(Some(encode(checkpoint)?)),
            ..Self::default()
        })
    }

    /// Makes subsequent saves fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<Checkpoint, PersistenceError> {
        match self.record.lock().await.as_deref() {
            Some(bytes) => decode(Path::new(MEMORY_PATH), bytes),
            None => Ok(Checkpoint::default()),
        }
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable(
                "memory store marked unavailable".to_string(),
            ));
        }

        let bytes = encode(checkpoint)?;
        *self.record.lock().await = Some(bytes);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
