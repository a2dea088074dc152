//! Watcher errors.

use swapwatch_ledger::LedgerError;

use crate::aggregator::AggregateError;
use crate::checkpoint::PersistenceError;
use crate::config::ConfigError;

/// Errors that end a poll cycle.
///
/// Notification failures never appear here; they are absorbed by the
/// gateway.
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    /// Reading the ledger failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Loading or saving the checkpoint failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Folding events into the totals failed.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl WatcherError {
    /// Returns true if the process should stop.
    ///
    /// Transient reads and failed saves are retried on the next cycle.
    /// An overflowing accumulator would fail the same way on every retry.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Ledger(e) => e.is_fatal(),
            Self::Persistence(_) => false,
            Self::Aggregate(AggregateError::Overflow(_)) => true,
            Self::Aggregate(AggregateError::InvalidSum { .. }) => true,
            Self::Config(_) => true,
        }
    }
}
