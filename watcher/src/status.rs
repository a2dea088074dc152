//! Derived status summary.
//!
//! Recomputed from a totals snapshot on the status timer. Building a
//! summary never touches the checkpoint store or the ledger.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregator::RunningTotals;
use crate::checkpoint::Checkpoint;

/// Display symbols for the two assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetLabels {
    /// Base asset symbol.
    pub base: String,
    /// Quote asset symbol.
    pub quote: String,
}

impl Default for AssetLabels {
    fn default() -> Self {
        Self::new("VTRU", "USDC")
    }
}

impl AssetLabels {
    /// Creates labels from the two symbols.
    #[must_use]
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

/// Point-in-time view of the running totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    /// Last committed height, if initialized.
    pub last_processed_height: Option<u64>,
    /// Base sum as a decimal string.
    pub base_sum: String,
    /// Quote sum as a decimal string.
    pub quote_sum: String,
    /// Average quote per base unit, six fractional digits.
    pub avg_ratio: Option<String>,
    /// Asset symbols.
    pub labels: AssetLabels,
    /// When the summary was built.
    pub generated_at: DateTime<Utc>,
}

impl StatusSummary {
    /// Builds a summary from totals.
    #[must_use]
    pub fn from_totals(
        last_processed_height: Option<u64>,
        totals: &RunningTotals,
        labels: AssetLabels,
    ) -> Self {
        Self {
            last_processed_height,
            base_sum: totals.base_sum().to_string(),
            quote_sum: totals.quote_sum().to_string(),
            avg_ratio: totals.avg_ratio(),
            labels,
            generated_at: Utc::now(),
        }
    }

    /// Builds a summary from a checkpoint.
    #[must_use]
    pub fn from_checkpoint(checkpoint: &Checkpoint, labels: AssetLabels) -> Self {
        Self::from_totals(checkpoint.last_processed_height, &checkpoint.totals, labels)
    }

    /// Returns the one-line activity text.
    #[must_use]
    pub fn activity_text(&self) -> String {
        match &self.avg_ratio {
            Some(ratio) => format!(
                "Avg: 1 {} = {} {}",
                self.labels.base, ratio, self.labels.quote
            ),
            None => format!(
                "Monitoring {}/{} swaps",
                self.labels.base, self.labels.quote
            ),
        }
    }
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.activity_text())
    }
}
