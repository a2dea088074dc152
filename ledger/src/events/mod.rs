//! Domain events and their classification.
//!
//! # Components
//!
//! - [`types`]: DomainEvent and its variants
//! - [`classifier`]: RawLogEntry to DomainEvent mapping
//! - [`units`]: Fixed-scale amount rendering

pub mod classifier;
pub mod types;
pub mod units;

pub use classifier::{classify, classify_batch, ClassifiedBatch, Classification, SkipReason};
pub use types::{
    DomainEvent, EventKind, EventOrigin, ListingCreated, OfferAccepted, SwapCompleted,
    BASE_DECIMALS, QUOTE_DECIMALS,
};
pub use units::format_units;
