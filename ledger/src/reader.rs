//! Ledger reader boundary.

use async_trait::async_trait;

use super::error::LedgerError;
use super::types::RawLogEntry;

/// Read access to the monitored contract's event log.
///
/// Implementations must return entries restricted to `[from, to]`
/// (inclusive) and ordered by `(block_height, log_index)` ascending.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Returns the current ledger height.
    async fn current_height(&self) -> Result<u64, LedgerError>;

    /// Returns the entries for the named events emitted in `[from, to]`.
    async fn get_events(
        &self,
        from: u64,
        to: u64,
        event_names: &[&str],
    ) -> Result<Vec<RawLogEntry>, LedgerError>;
}
