//! Durable checkpoint of processing progress.
//!
//! A checkpoint pairs the last fully processed height with the running
//! totals accumulated up to and including that height. Both are always
//! written together so the totals never drift from the height they belong
//! to.
//!
//! # Components
//!
//! - [`Checkpoint`] and [`PollRange`]: in-memory progress
//! - [`CheckpointStore`]: load/save boundary
//! - [`file`]: atomic JSON file store
//! - [`memory`]: in-memory store for dry runs and tests

pub mod file;
pub mod memory;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator::RunningTotals;

pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;

/// Checkpoint persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Reading or writing the backing medium failed.
    #[error("checkpoint I/O failed for {}: {source}", .path.display())]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The stored record cannot be decoded.
    #[error("checkpoint at {} is corrupt: {reason}", .path.display())]
    Corrupt {
        /// Path involved.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },

    /// The record could not be encoded.
    #[error("failed to encode checkpoint: {0}")]
    Encode(#[from] serde_json::Error),

    /// The backing medium refused the write.
    #[error("checkpoint medium unavailable: {0}")]
    Unavailable(String),
}

/// Inclusive range of heights scanned by one cycle.
///
/// `from > to` is a legal empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRange {
    /// First height to scan.
    pub from: u64,
    /// Last height to scan.
    pub to: u64,
}

impl PollRange {
    /// Returns the range following `last_processed` up to `current_height`.
    #[must_use]
    pub const fn after(last_processed: u64, current_height: u64) -> Self {
        Self {
            from: last_processed.saturating_add(1),
            to: current_height,
        }
    }

    /// Returns true if there is nothing to scan.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.from > self.to
    }

    /// Returns the number of heights in the range.
    #[must_use]
    pub const fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.to - self.from + 1
        }
    }
}

/// Last processed height plus the totals accumulated up to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    /// Last fully processed height; `None` until the first initialization.
    pub last_processed_height: Option<u64>,

    /// Totals over every event up to `last_processed_height`.
    pub totals: RunningTotals,
}

impl Checkpoint {
    /// Creates a checkpoint at the given height.
    #[must_use]
    pub const fn at(height: u64, totals: RunningTotals) -> Self {
        Self {
            last_processed_height: Some(height),
            totals,
        }
    }

    /// Returns true once a starting height has been chosen.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.last_processed_height.is_some()
    }

    /// Returns the range to scan given the current ledger height.
    ///
    /// `None` while uninitialized.
    #[must_use]
    pub fn next_range(&self, current_height: u64) -> Option<PollRange> {
        self.last_processed_height
            .map(|last| PollRange::after(last, current_height))
    }

    /// Returns the checkpoint after committing a range.
    ///
    /// The height never moves backwards.
    #[must_use]
    pub fn advanced(&self, to: u64, totals: RunningTotals) -> Self {
        let height = self.last_processed_height.map_or(to, |last| last.max(to));
        Self::at(height, totals)
    }
}

/// On-disk checkpoint record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRecord {
    /// Last processed height; `null` when uninitialized.
    pub last_processed_height: Option<u64>,

    /// Running totals, string-encoded.
    #[serde(default)]
    pub totals_by_metric: TotalsRecord,

    /// When the record was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// String-encoded running totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsRecord {
    /// Quote asset sum as a decimal string.
    pub quote_sum: String,
    /// Base asset sum as a decimal string.
    pub base_sum: String,
}

impl Default for TotalsRecord {
    fn default() -> Self {
        Self {
            quote_sum: "0".to_string(),
            base_sum: "0".to_string(),
        }
    }
}

impl CheckpointRecord {
    /// Builds a record from a checkpoint.
    #[must_use]
    pub fn from_checkpoint(checkpoint: &Checkpoint, updated_at: DateTime<Utc>) -> Self {
        Self {
            last_processed_height: checkpoint.last_processed_height,
            totals_by_metric: TotalsRecord {
                quote_sum: checkpoint.totals.quote_sum().to_string(),
                base_sum: checkpoint.totals.base_sum().to_string(),
            },
            updated_at: Some(updated_at),
        }
    }

    /// Converts the record back into a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error message if a sum is not a decimal integer.
    pub fn into_checkpoint(self) -> Result<Checkpoint, String> {
        let totals = RunningTotals::from_decimal_strings(
            &self.totals_by_metric.base_sum,
            &self.totals_by_metric.quote_sum,
        )
        .map_err(|e| e.to_string())?;

        Ok(Checkpoint {
            last_processed_height: self.last_processed_height,
            totals,
        })
    }
}

/// Encodes a checkpoint as pretty JSON.
pub(crate) fn encode(checkpoint: &Checkpoint) -> Result<Vec<u8>, PersistenceError> {
    let record = CheckpointRecord::from_checkpoint(checkpoint, Utc::now());
    Ok(serde_json::to_vec_pretty(&record)?)
}

/// Decodes a checkpoint from JSON.
pub(crate) fn decode(path: &std::path::Path, bytes: &[u8]) -> Result<Checkpoint, PersistenceError> {
    let record: CheckpointRecord =
        serde_json::from_slice(bytes).map_err(|e| PersistenceError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    record
        .into_checkpoint()
        .map_err(|reason| PersistenceError::Corrupt {
            path: path.to_path_buf(),
            reason,
        })
}

/// Durable storage for the checkpoint.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Loads the last saved checkpoint, or an uninitialized one if none exists.
    async fn load(&self) -> Result<Checkpoint, PersistenceError>;

    /// Replaces the stored checkpoint atomically.
    ///
    /// A failed save leaves the previously stored checkpoint intact.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Accumulator;

    #[test]
    fn test_poll_range_after() {
        let range = PollRange::after(50, 150);
        assert_eq!(range, PollRange { from: 51, to: 150 });
        assert_eq!(range.len(), 100);
        assert!(!range.is_empty());
    }

    #[test]
    fn test_poll_range_empty() {
        let range = PollRange::after(150, 150);
        assert!(range.is_empty());
        assert_eq!(range.len(), 0);

        let behind = PollRange::after(150, 120);
        assert!(behind.is_empty());
    }

    #[test]
    fn test_checkpoint_default_is_uninitialized() {
        let checkpoint = Checkpoint::default();
        assert!(!checkpoint.is_initialized());
        assert!(checkpoint.next_range(150).is_none());
    }

    #[test]
    fn test_checkpoint_advanced_never_rewinds() {
        let checkpoint = Checkpoint::at(100, RunningTotals::default());

        assert_eq!(
            checkpoint.advanced(150, RunningTotals::default()).last_processed_height,
            Some(150)
        );
        assert_eq!(
            checkpoint.advanced(90, RunningTotals::default()).last_processed_height,
            Some(100)
        );
    }

    #[test]
    fn test_record_uses_string_sums() {
        let checkpoint = Checkpoint::at(
            50,
            RunningTotals::new(
                Accumulator::from(2_000_000_000_000_000_000u128),
                Accumulator::from(10_000_000u64),
            ),
        );
        let record = CheckpointRecord::from_checkpoint(&checkpoint, Utc::now());
        let json = serde_json::to_value(&record).expect("json");

        assert_eq!(json["lastProcessedHeight"], 50);
        assert_eq!(json["totalsByMetric"]["baseSum"], "2000000000000000000");
        assert_eq!(json["totalsByMetric"]["quoteSum"], "10000000");
    }

    #[test]
    fn test_decode_uninitialized_record() {
        let bytes = br#"{"lastProcessedHeight": null}"#;
        let checkpoint = decode(std::path::Path::new("c.json"), bytes).expect("decode");

        assert_eq!(checkpoint, Checkpoint::default());
    }

    #[test]
    fn test_decode_rejects_numeric_sums() {
        let bytes = br#"{"lastProcessedHeight": 7, "totalsByMetric": {"quoteSum": 5, "baseSum": "1"}}"#;
        let err = decode(std::path::Path::new("c.json"), bytes).expect_err("corrupt");
        assert!(matches!(err, PersistenceError::Corrupt { .. }));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode(std::path::Path::new("c.json"), b"not json").expect_err("corrupt");
        assert!(err.to_string().contains("c.json"));
    }
}
