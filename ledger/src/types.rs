//! Raw ledger types.
//!
//! Defines the raw log entry handed from the reader to the classifier and
//! the event signatures of the monitored contract.

use alloy_primitives::B256;
use alloy_sol_types::SolEvent;
use serde::{Deserialize, Serialize};

use crate::abi;
use crate::events::EventKind;

/// A contract event signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSignature {
    /// Domain event this signature decodes into.
    pub kind: EventKind,

    /// Event name as used in the ABI.
    pub name: &'static str,

    /// Canonical declaration hashed into `topics[0]`.
    pub declaration: &'static str,

    /// Keccak-256 hash of the declaration.
    pub topic: B256,
}

impl EventSignature {
    const fn of<E: SolEvent>(kind: EventKind) -> Self {
        Self {
            kind,
            name: kind.as_str(),
            declaration: E::SIGNATURE,
            topic: E::SIGNATURE_HASH,
        }
    }
}

/// Signature of [`abi::ListingCreated`].
pub const LISTING_CREATED: EventSignature =
    EventSignature::of::<abi::ListingCreated>(EventKind::ListingCreated);

/// Signature of [`abi::SwapCompleted`].
pub const SWAP_COMPLETED: EventSignature =
    EventSignature::of::<abi::SwapCompleted>(EventKind::SwapCompleted);

/// Signature of [`abi::OfferAccepted`].
pub const OFFER_ACCEPTED: EventSignature =
    EventSignature::of::<abi::OfferAccepted>(EventKind::OfferAccepted);

/// All signatures the monitored contract emits that we model.
pub static KNOWN_SIGNATURES: [EventSignature; 3] = [LISTING_CREATED, SWAP_COMPLETED, OFFER_ACCEPTED];

/// Event names requested from the reader on every cycle.
pub const MONITORED_EVENTS: [&str; 3] = [
    LISTING_CREATED.name,
    SWAP_COMPLETED.name,
    OFFER_ACCEPTED.name,
];

/// Looks up a known signature by event name.
#[must_use]
pub fn signature_by_name(name: &str) -> Option<&'static EventSignature> {
    KNOWN_SIGNATURES.iter().find(|sig| sig.name == name)
}

/// A log entry as returned by the reader, before classification.
///
/// Arguments are kept as raw 32-byte words in emission order; typing them
/// is the classifier's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLogEntry {
    /// Name of the matched event signature.
    pub event_name: String,

    /// Indexed arguments (`topics[1..]`).
    pub indexed_args: Vec<B256>,

    /// Non-indexed arguments, one 32-byte word each.
    pub data_args: Vec<B256>,

    /// Block height of the emitting transaction.
    pub block_height: u64,

    /// Transaction hash.
    pub tx_hash: B256,

    /// Log index within the block.
    pub log_index: u64,
}

impl RawLogEntry {
    /// Returns the ordering key `(block_height, log_index)`.
    #[must_use]
    pub const fn position(&self) -> (u64, u64) {
        (self.block_height, self.log_index)
    }
}
