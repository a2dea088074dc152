//! Watcher configuration.
//!
//! Provides configuration options for the watcher service, loaded from
//! environment variables.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use swapwatch_ledger::RpcConfig;

use crate::notifier::ChannelKey;
use crate::status::AssetLabels;

/// Default explorer transaction URL prefix.
pub const DEFAULT_EXPLORER_BASE_URL: &str = "https://explorer.vitruveo.xyz/tx";

/// Configuration for the watcher service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Node JSON-RPC endpoint.
    pub rpc_url: String,

    /// Monitored contract address (hex).
    pub contract_address: String,

    /// Webhook for listing notifications.
    pub listing_webhook_url: Option<String>,

    /// Webhook for swap notifications.
    pub swap_webhook_url: Option<String>,

    /// Webhook for offer notifications.
    pub offer_webhook_url: Option<String>,

    /// Poll interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Status publish interval in milliseconds.
    pub status_interval_ms: u64,

    /// Blocks scanned behind the tip on first start.
    pub backfill_blocks: u64,

    /// Widest block range per log query.
    pub max_block_range: u64,

    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// Checkpoint file path.
    pub checkpoint_path: PathBuf,

    /// Explorer URL prefix for transaction links.
    pub explorer_base_url: String,

    /// Base asset symbol.
    pub base_symbol: String,

    /// Quote asset symbol.
    pub quote_symbol: String,

    /// Overwrite the checkpoint with an uninitialized one at startup.
    pub reset_checkpoint: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: String::new(),
            listing_webhook_url: None,
            swap_webhook_url: None,
            offer_webhook_url: None,
            poll_interval_ms: 30_000,
            status_interval_ms: 60_000,
            backfill_blocks: 100,
            max_block_range: 2_000,
            request_timeout_ms: 30_000,
            checkpoint_path: PathBuf::from("checkpoint.json"),
            explorer_base_url: DEFAULT_EXPLORER_BASE_URL.to_string(),
            base_symbol: "VTRU".to_string(),
            quote_symbol: "USDC".to_string(),
            reset_checkpoint: false,
        }
    }
}

impl WatcherConfig {
    /// Creates a configuration for the given endpoint and contract.
    #[must_use]
    pub fn new(rpc_url: impl Into<String>, contract_address: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_address: contract_address.into(),
            ..Default::default()
        }
    }

    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or boolean variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through a variable lookup.
    ///
    /// Unset and empty variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or boolean variable does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(v) = get("RPC_URL") {
            config.rpc_url = v;
        }
        if let Some(v) = get("CONTRACT_ADDRESS") {
            config.contract_address = v;
        }
        config.listing_webhook_url = get("LISTING_WEBHOOK_URL");
        config.swap_webhook_url = get("SWAP_WEBHOOK_URL");
        config.offer_webhook_url = get("OFFER_WEBHOOK_URL");

        if let Some(v) = get("POLL_INTERVAL_MS") {
            config.poll_interval_ms = parse_number("POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = get("STATUS_INTERVAL_MS") {
            config.status_interval_ms = parse_number("STATUS_INTERVAL_MS", &v)?;
        }
        if let Some(v) = get("BACKFILL_BLOCKS") {
            config.backfill_blocks = parse_number("BACKFILL_BLOCKS", &v)?;
        }
        if let Some(v) = get("MAX_BLOCK_RANGE") {
            config.max_block_range = parse_number("MAX_BLOCK_RANGE", &v)?;
        }
        if let Some(v) = get("REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = parse_number("REQUEST_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("CHECKPOINT_PATH") {
            config.checkpoint_path = PathBuf::from(v);
        }
        if let Some(v) = get("EXPLORER_BASE_URL") {
            config.explorer_base_url = v;
        }
        if let Some(v) = get("BASE_SYMBOL") {
            config.base_symbol = v;
        }
        if let Some(v) = get("QUOTE_SYMBOL") {
            config.quote_symbol = v;
        }
        if let Some(v) = get("RESET_CHECKPOINT") {
            config.reset_checkpoint = parse_bool("RESET_CHECKPOINT", &v)?;
        }

        Ok(config)
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Sets the status interval.
    #[must_use]
    pub fn with_status_interval(mut self, ms: u64) -> Self {
        self.status_interval_ms = ms;
        self
    }

    /// Sets the backfill depth.
    #[must_use]
    pub fn with_backfill_blocks(mut self, blocks: u64) -> Self {
        self.backfill_blocks = blocks;
        self
    }

    /// Sets the checkpoint path.
    #[must_use]
    pub fn with_checkpoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = path.into();
        self
    }

    /// Sets the webhook for a channel.
    #[must_use]
    pub fn with_webhook(mut self, channel: ChannelKey, url: impl Into<String>) -> Self {
        let url = Some(url.into());
        match channel {
            ChannelKey::Listing => self.listing_webhook_url = url,
            ChannelKey::Swap => self.swap_webhook_url = url,
            ChannelKey::Offer => self.offer_webhook_url = url,
        }
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_http_url(&self.rpc_url) {
            return Err(ConfigError::InvalidRpcUrl(self.rpc_url.clone()));
        }

        self.parse_contract()?;

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }

        if self.status_interval_ms == 0 {
            return Err(ConfigError::InvalidStatusInterval);
        }

        if self.max_block_range == 0 {
            return Err(ConfigError::InvalidBlockRange);
        }

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidRequestTimeout);
        }

        for (channel, url) in self.webhook_routes() {
            if !is_http_url(&url) {
                return Err(ConfigError::InvalidWebhookUrl { channel, url });
            }
        }

        Ok(())
    }

    /// Parses the contract address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not 20 hex bytes or is zero.
    pub fn parse_contract(&self) -> Result<Address, ConfigError> {
        let address = Address::from_str(self.contract_address.trim())
            .map_err(|_| ConfigError::InvalidContractAddress(self.contract_address.clone()))?;

        if address == Address::ZERO {
            return Err(ConfigError::InvalidContractAddress(
                self.contract_address.clone(),
            ));
        }

        Ok(address)
    }

    /// Builds the ledger reader configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the contract address is invalid.
    pub fn rpc_config(&self) -> Result<RpcConfig, ConfigError> {
        Ok(RpcConfig::new(self.rpc_url.clone(), self.parse_contract()?)
            .with_timeout(self.request_timeout())
            .with_max_block_range(self.max_block_range))
    }

    /// Returns the configured webhook per channel.
    #[must_use]
    pub fn webhook_routes(&self) -> HashMap<ChannelKey, String> {
        [
            (ChannelKey::Listing, &self.listing_webhook_url),
            (ChannelKey::Swap, &self.swap_webhook_url),
            (ChannelKey::Offer, &self.offer_webhook_url),
        ]
        .into_iter()
        .filter_map(|(channel, url)| url.clone().map(|u| (channel, u)))
        .collect()
    }

    /// Returns the asset labels.
    #[must_use]
    pub fn labels(&self) -> AssetLabels {
        AssetLabels::new(self.base_symbol.clone(), self.quote_symbol.clone())
    }

    /// Returns the poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the status interval.
    #[must_use]
    pub const fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn parse_number(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvValue {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvValue {
            key,
            value: value.to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid RPC endpoint.
    #[error("RPC_URL must be an http(s) URL, got {0:?}")]
    InvalidRpcUrl(String),

    /// Invalid contract address.
    #[error("invalid contract address: {0:?}")]
    InvalidContractAddress(String),

    /// Invalid poll interval.
    #[error("poll_interval_ms must be > 0")]
    InvalidPollInterval,

    /// Invalid status interval.
    #[error("status_interval_ms must be > 0")]
    InvalidStatusInterval,

    /// Invalid block range.
    #[error("max_block_range must be > 0")]
    InvalidBlockRange,

    /// Invalid request timeout.
    #[error("request_timeout_ms must be > 0")]
    InvalidRequestTimeout,

    /// Invalid webhook URL.
    #[error("webhook for {channel} channel must be an http(s) URL, got {url:?}")]
    InvalidWebhookUrl {
        /// Channel.
        channel: ChannelKey,
        /// Offending URL.
        url: String,
    },

    /// Unparsable environment value.
    #[error("invalid value for {key}: {value:?}")]
    InvalidEnvValue {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
}
