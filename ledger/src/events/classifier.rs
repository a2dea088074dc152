//! Event classifier.
//!
//! Maps raw log entries to [`DomainEvent`]s. Classification is a pure
//! function of the entry, so a range can be re-derived after a crash and
//! yield the same events.

use alloy_primitives::B256;
use alloy_sol_types::SolEvent;
use tracing::{debug, warn};

use super::types::{
    DomainEvent, EventKind, EventOrigin, ListingCreated, OfferAccepted, SwapCompleted,
};
use crate::abi;
use crate::types::{signature_by_name, EventSignature, RawLogEntry};

/// Why an entry did not produce a domain event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    /// The event is not one we model.
    #[error("unknown event {0}")]
    UnknownEvent(String),

    /// The entry matched a known event but its arguments do not fit.
    #[error("malformed {event}: {reason}")]
    Malformed {
        /// Event name.
        event: String,
        /// What was wrong.
        reason: String,
    },
}

impl SkipReason {
    /// Returns true for malformed entries of known events.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Result of classifying a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A typed domain event.
    Event(DomainEvent),
    /// The entry was skipped.
    Skip(SkipReason),
}

/// A classified batch, order preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedBatch {
    /// Classified events in `(block_height, log_index)` order.
    pub events: Vec<DomainEvent>,

    /// Skipped entries with their position and reason.
    pub skipped: Vec<((u64, u64), SkipReason)>,
}

impl ClassifiedBatch {
    /// Returns the number of malformed entries in the batch.
    #[must_use]
    pub fn malformed_count(&self) -> usize {
        self.skipped
            .iter()
            .filter(|(_, reason)| reason.is_malformed())
            .count()
    }
}

/// Classifies a single raw entry.
#[must_use]
pub fn classify(entry: &RawLogEntry) -> Classification {
    let Some(signature) = signature_by_name(&entry.event_name) else {
        return Classification::Skip(SkipReason::UnknownEvent(entry.event_name.clone()));
    };

    match decode(signature, entry) {
        Ok(event) => Classification::Event(event),
        Err(reason) => Classification::Skip(SkipReason::Malformed {
            event: entry.event_name.clone(),
            reason,
        }),
    }
}

/// Classifies a batch, skipping entries that do not classify.
///
/// A bad entry never aborts the batch.
#[must_use]
pub fn classify_batch(entries: &[RawLogEntry]) -> ClassifiedBatch {
    let mut batch = ClassifiedBatch::default();

    for entry in entries {
        match classify(entry) {
            Classification::Event(event) => batch.events.push(event),
            Classification::Skip(reason) => {
                if reason.is_malformed() {
                    warn!(
                        "Skipping entry at block {} log {}: {}",
                        entry.block_height, entry.log_index, reason
                    );
                } else {
                    debug!(
                        "Ignoring entry at block {} log {}: {}",
                        entry.block_height, entry.log_index, reason
                    );
                }
                batch.skipped.push((entry.position(), reason));
            }
        }
    }

    batch
}

fn decode(signature: &EventSignature, entry: &RawLogEntry) -> Result<DomainEvent, String> {
    let origin = EventOrigin {
        block_height: entry.block_height,
        tx_hash: entry.tx_hash,
        log_index: entry.log_index,
    };

    let event = match signature.kind {
        EventKind::ListingCreated => {
            let log: abi::ListingCreated = decode_log(signature, entry)?;
            DomainEvent::ListingCreated(ListingCreated {
                listing_id: log.listingId,
                seller: log.seller,
                base_amount: log.baseAmount,
                quote_amount: log.quoteAmount,
                origin,
            })
        }
        EventKind::SwapCompleted => {
            let log: abi::SwapCompleted = decode_log(signature, entry)?;
            DomainEvent::SwapCompleted(SwapCompleted {
                listing_id: log.listingId,
                buyer: log.buyer,
                quote_amount: log.quoteAmount,
                base_amount: log.baseAmount,
                origin,
            })
        }
        EventKind::OfferAccepted => {
            let log: abi::OfferAccepted = decode_log(signature, entry)?;
            DomainEvent::OfferAccepted(OfferAccepted {
                listing_id: log.listingId,
                seller: log.seller,
                buyer: log.buyer,
                quote_amount: log.quoteAmount,
                base_amount: log.baseAmount,
                origin,
            })
        }
    };

    Ok(event)
}

/// ABI-decodes an entry, rejecting arguments that do not re-encode to the
/// same words (wrong counts, dirty address padding).
fn decode_log<E: SolEvent>(signature: &EventSignature, entry: &RawLogEntry) -> Result<E, String> {
    let topics: Vec<B256> = std::iter::once(signature.topic)
        .chain(entry.indexed_args.iter().copied())
        .collect();
    let data: Vec<u8> = entry.data_args.iter().flat_map(|word| word.0).collect();

    let log = E::decode_raw_log(topics.iter().copied(), &data, true).map_err(|e| e.to_string())?;

    let encoded_topics: Vec<B256> = log.encode_topics().into_iter().map(|t| t.0).collect();
    if encoded_topics != topics {
        return Err(format!(
            "expected {} canonical topics, got {}",
            encoded_topics.len(),
            topics.len()
        ));
    }
    if log.encode_data() != data {
        return Err(format!(
            "data section of {} words is not canonical",
            entry.data_args.len()
        ));
    }

    Ok(log)
}
