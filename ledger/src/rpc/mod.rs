//! JSON-RPC implementation of the ledger reader.

pub mod client;
pub mod config;

pub use client::JsonRpcLedgerReader;
pub use config::{RpcConfig, DEFAULT_MAX_BLOCK_RANGE, DEFAULT_TIMEOUT_SECS};
