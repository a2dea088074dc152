//! JSON-RPC reader configuration.

use std::time::Duration;

use alloy_primitives::Address;

use crate::error::LedgerError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default widest block range per `eth_getLogs` call.
pub const DEFAULT_MAX_BLOCK_RANGE: u64 = 2_000;

/// Configuration for [`super::JsonRpcLedgerReader`].
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Node endpoint URL.
    pub endpoint: String,

    /// Address of the monitored contract.
    pub contract: Address,

    /// Request timeout.
    pub timeout: Duration,

    /// Widest inclusive block range sent in a single log query.
    pub max_block_range: u64,

    /// User agent string.
    pub user_agent: String,
}

impl RpcConfig {
    /// Creates a new configuration for the given endpoint and contract.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, contract: Address) -> Self {
        Self {
            endpoint: endpoint.into(),
            contract,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_block_range: DEFAULT_MAX_BLOCK_RANGE,
            user_agent: format!("swapwatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the widest block range per log query.
    #[must_use]
    pub fn with_max_block_range(mut self, max_block_range: u64) -> Self {
        self.max_block_range = max_block_range;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a fatal configuration error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.endpoint.is_empty() {
            return Err(LedgerError::FatalConfig(
                "endpoint cannot be empty".to_string(),
            ));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(LedgerError::FatalConfig(
                "endpoint must start with http:// or https://".to_string(),
            ));
        }

        if self.contract == Address::ZERO {
            return Err(LedgerError::FatalConfig(
                "contract address cannot be zero".to_string(),
            ));
        }

        if self.max_block_range == 0 {
            return Err(LedgerError::FatalConfig(
                "max_block_range must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Splits `[from, to]` into consecutive inclusive chunks no wider than
    /// `max_block_range`.
    #[must_use]
    pub fn chunks(&self, from: u64, to: u64) -> Vec<(u64, u64)> {
        let mut chunks = Vec::new();
        let width = self.max_block_range.max(1);
        let mut start = from;

        while start <= to {
            let end = start.saturating_add(width - 1).min(to);
            chunks.push((start, end));
            if end == u64::MAX {
                break;
            }
            start = end + 1;
        }

        chunks
    }
}
