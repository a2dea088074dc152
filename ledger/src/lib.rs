//! Swapwatch Ledger - Read access to the monitored contract's event log.
//!
//! This crate provides the ledger reader boundary, its JSON-RPC
//! implementation, and the pure classifier that turns raw log entries into
//! typed domain events.
//!
//! # Components
//!
//! - [`abi`]: Solidity declarations of the monitored events
//! - [`types`]: RawLogEntry and the contract's event signatures
//! - [`reader`]: LedgerReader trait
//! - [`rpc`]: JSON-RPC reader with range chunking
//! - [`events`]: DomainEvent types and the classifier
//! - [`error`]: Transient vs. fatal read errors

pub mod abi;
pub mod error;
pub mod events;
pub mod reader;
pub mod rpc;
pub mod types;

pub use error::LedgerError;
pub use events::{
    classify, classify_batch, format_units, ClassifiedBatch, Classification, DomainEvent,
    EventKind, EventOrigin, SkipReason,
};
pub use reader::LedgerReader;
pub use rpc::{JsonRpcLedgerReader, RpcConfig};
pub use types::{EventSignature, RawLogEntry, MONITORED_EVENTS};
