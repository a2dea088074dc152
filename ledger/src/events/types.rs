//! Domain event types.
//!
//! Typed views of the monitored contract's events. Parties are plain
//! 20-byte addresses; amounts are raw integers at a fixed implicit scale.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Implicit decimal scale of the base asset.
pub const BASE_DECIMALS: u32 = 18;

/// Implicit decimal scale of the quote asset.
pub const QUOTE_DECIMALS: u32 = 6;

/// Where an event came from on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventOrigin {
    /// Block height.
    pub block_height: u64,
    /// Transaction hash.
    pub tx_hash: B256,
    /// Log index within the block.
    pub log_index: u64,
}

/// Kind of a domain event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A listing was created.
    ListingCreated,
    /// A listing was bought.
    SwapCompleted,
    /// An offer on a listing was accepted.
    OfferAccepted,
}

impl EventKind {
    /// Returns the ABI event name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ListingCreated => "ListingCreated",
            Self::SwapCompleted => "SwapCompleted",
            Self::OfferAccepted => "OfferAccepted",
        }
    }
}

/// A new listing offering base asset for quote asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingCreated {
    /// Listing identifier.
    pub listing_id: U256,
    /// Seller address.
    pub seller: Address,
    /// Base asset amount (18 decimals).
    pub base_amount: U256,
    /// Quote asset amount (6 decimals).
    pub quote_amount: U256,
    /// Ledger origin.
    pub origin: EventOrigin,
}

/// A completed swap against a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapCompleted {
    /// Listing identifier.
    pub listing_id: U256,
    /// Buyer address.
    pub buyer: Address,
    /// Base asset amount (18 decimals).
    pub base_amount: U256,
    /// Quote asset amount (6 decimals).
    pub quote_amount: U256,
    /// Ledger origin.
    pub origin: EventOrigin,
}

/// An accepted offer on a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferAccepted {
    /// Listing identifier.
    pub listing_id: U256,
    /// Seller address.
    pub seller: Address,
    /// Buyer address.
    pub buyer: Address,
    /// Base asset amount (18 decimals).
    pub base_amount: U256,
    /// Quote asset amount (6 decimals).
    pub quote_amount: U256,
    /// Ledger origin.
    pub origin: EventOrigin,
}

/// A classified contract event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    /// See [`ListingCreated`].
    ListingCreated(ListingCreated),
    /// See [`SwapCompleted`].
    SwapCompleted(SwapCompleted),
    /// See [`OfferAccepted`].
    OfferAccepted(OfferAccepted),
}

impl DomainEvent {
    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::ListingCreated(_) => EventKind::ListingCreated,
            Self::SwapCompleted(_) => EventKind::SwapCompleted,
            Self::OfferAccepted(_) => EventKind::OfferAccepted,
        }
    }

    /// Returns the ledger origin.
    #[must_use]
    pub const fn origin(&self) -> &EventOrigin {
        match self {
            Self::ListingCreated(e) => &e.origin,
            Self::SwapCompleted(e) => &e.origin,
            Self::OfferAccepted(e) => &e.origin,
        }
    }

    /// Returns the listing identifier.
    #[must_use]
    pub const fn listing_id(&self) -> U256 {
        match self {
            Self::ListingCreated(e) => e.listing_id,
            Self::SwapCompleted(e) => e.listing_id,
            Self::OfferAccepted(e) => e.listing_id,
        }
    }

    /// Returns the base asset amount.
    #[must_use]
    pub const fn base_amount(&self) -> U256 {
        match self {
            Self::ListingCreated(e) => e.base_amount,
            Self::SwapCompleted(e) => e.base_amount,
            Self::OfferAccepted(e) => e.base_amount,
        }
    }

    /// Returns the quote asset amount.
    #[must_use]
    pub const fn quote_amount(&self) -> U256 {
        match self {
            Self::ListingCreated(e) => e.quote_amount,
            Self::SwapCompleted(e) => e.quote_amount,
            Self::OfferAccepted(e) => e.quote_amount,
        }
    }

    /// Returns true if the event feeds the running swap totals.
    #[must_use]
    pub const fn is_swap_bearing(&self) -> bool {
        matches!(self, Self::SwapCompleted(_))
    }
}
