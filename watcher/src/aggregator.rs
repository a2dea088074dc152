//! Running swap totals.
//!
//! Sums are kept as 512-bit integers so that adding any realistic number of
//! 256-bit event amounts stays exact. Floating point is never used for the
//! accumulators; the average ratio is rendered from scaled integer division.

use std::str::FromStr;

use alloy_primitives::{Uint, U256};
use swapwatch_ledger::events::{DomainEvent, BASE_DECIMALS, QUOTE_DECIMALS};

/// Accumulator type for the running sums.
pub type Accumulator = Uint<512, 8>;

/// Fractional digits of the rendered average ratio.
pub const RATIO_DECIMALS: u32 = 6;

/// Aggregation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    /// A running sum would exceed the accumulator width.
    #[error("running {0} sum overflowed")]
    Overflow(&'static str),

    /// A persisted sum could not be parsed.
    #[error("invalid {metric} sum {value:?}")]
    InvalidSum {
        /// Metric name.
        metric: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Cumulative base and quote amounts over all recorded swaps.
///
/// Totals only ever grow; there is no subtraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningTotals {
    base_sum: Accumulator,
    quote_sum: Accumulator,
}

impl Default for RunningTotals {
    fn default() -> Self {
        Self::new(Accumulator::ZERO, Accumulator::ZERO)
    }
}

impl RunningTotals {
    /// Creates totals from existing sums.
    #[must_use]
    pub const fn new(base_sum: Accumulator, quote_sum: Accumulator) -> Self {
        Self {
            base_sum,
            quote_sum,
        }
    }

    /// Parses totals from their decimal string encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if either string is not a non-negative integer.
    pub fn from_decimal_strings(base_sum: &str, quote_sum: &str) -> Result<Self, AggregateError> {
        let parse = |metric: &'static str, value: &str| {
            let trimmed = value.trim();
            if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                return Err(AggregateError::InvalidSum {
                    metric,
                    value: value.to_string(),
                });
            }
            Accumulator::from_str(trimmed).map_err(|_| AggregateError::InvalidSum {
                metric,
                value: value.to_string(),
            })
        };

        Ok(Self::new(parse("base", base_sum)?, parse("quote", quote_sum)?))
    }

    /// Returns the base asset sum.
    #[must_use]
    pub const fn base_sum(&self) -> Accumulator {
        self.base_sum
    }

    /// Returns the quote asset sum.
    #[must_use]
    pub const fn quote_sum(&self) -> Accumulator {
        self.quote_sum
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base_sum.is_zero() && self.quote_sum.is_zero()
    }

    /// Adds a swap-bearing event to the sums.
    ///
    /// Returns `Ok(false)` for events that do not feed the totals. Zero
    /// amounts are valid and counted.
    ///
    /// # Errors
    ///
    /// Returns an error if a sum would overflow; the totals are unchanged.
    pub fn record(&mut self, event: &DomainEvent) -> Result<bool, AggregateError> {
        if !event.is_swap_bearing() {
            return Ok(false);
        }

        let base_sum = self
            .base_sum
            .checked_add(widen(event.base_amount()))
            .ok_or(AggregateError::Overflow("base"))?;
        let quote_sum = self
            .quote_sum
            .checked_add(widen(event.quote_amount()))
            .ok_or(AggregateError::Overflow("quote"))?;

        self.base_sum = base_sum;
        self.quote_sum = quote_sum;
        Ok(true)
    }

    /// Returns new totals with every swap-bearing event folded in.
    ///
    /// `self` is left untouched so a failed commit can discard the result.
    ///
    /// # Errors
    ///
    /// Returns an error if a sum would overflow.
    pub fn fold(&self, events: &[DomainEvent]) -> Result<Self, AggregateError> {
        let mut totals = self.clone();
        for event in events {
            totals.record(event)?;
        }
        Ok(totals)
    }

    /// Returns the average quote-per-base ratio scaled by `10^RATIO_DECIMALS`.
    ///
    /// `None` when no base amount has been recorded.
    #[must_use]
    pub fn avg_ratio_scaled(&self) -> Option<Accumulator> {
        if self.base_sum.is_zero() {
            return None;
        }

        let scale = pow10(BASE_DECIMALS - QUOTE_DECIMALS + RATIO_DECIMALS);
        let numerator = self.quote_sum.checked_mul(scale)?;
        Some(numerator / self.base_sum)
    }

    /// Returns the average ratio rendered with exactly six fractional digits.
    #[must_use]
    pub fn avg_ratio(&self) -> Option<String> {
        let scaled = self.avg_ratio_scaled()?;
        let unit = pow10(RATIO_DECIMALS);
        let fraction = (scaled % unit).to_string();
        Some(format!(
            "{}.{:0>width$}",
            scaled / unit,
            fraction,
            width = RATIO_DECIMALS as usize
        ))
    }
}

/// Widens an event amount to the accumulator width.
fn widen(value: U256) -> Accumulator {
    Accumulator::from_be_slice(&value.to_be_bytes::<32>())
}

fn pow10(exp: u32) -> Accumulator {
    let ten = Accumulator::from(10u64);
    (0..exp).fold(Accumulator::from(1u64), |acc, _| acc * ten)
}
