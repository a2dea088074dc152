//! JSON-RPC ledger reader.
//!
//! Talks to an EVM node over HTTP with `eth_blockNumber`, `eth_getLogs`
//! and `eth_getCode`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Bytes, B256, U64};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use super::config::RpcConfig;
use crate::error::LedgerError;
use crate::reader::LedgerReader;
use crate::types::{signature_by_name, EventSignature, RawLogEntry};

/// JSON-RPC code for an unsupported method.
const METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC code nodes return when a log query matches too many results.
const LIMIT_EXCEEDED: i64 = -32005;

/// JSON-RPC request envelope.
#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Log object as returned by `eth_getLogs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    #[serde(default)]
    topics: Vec<B256>,
    #[serde(default)]
    data: Bytes,
    block_number: Option<U64>,
    transaction_hash: Option<B256>,
    log_index: Option<U64>,
    #[serde(default)]
    removed: bool,
}

/// Ledger reader backed by an EVM JSON-RPC endpoint.
#[derive(Debug)]
pub struct JsonRpcLedgerReader {
    config: RpcConfig,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcLedgerReader {
    /// Creates a new reader.
    ///
    /// # Errors
    ///
    /// Returns a fatal configuration error if the configuration is invalid or
    /// the HTTP client cannot be created.
    pub fn new(config: RpcConfig) -> Result<Self, LedgerError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| LedgerError::FatalConfig(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Returns the reader configuration.
    #[must_use]
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Checks that bytecode is deployed at the monitored address.
    ///
    /// # Errors
    ///
    /// Returns a fatal configuration error if the address has no code.
    pub async fn verify_contract(&self) -> Result<(), LedgerError> {
        let code: String = self
            .call("eth_getCode", json!([self.config.contract, "latest"]))
            .await?;

        if code.trim_start_matches("0x").is_empty() {
            return Err(LedgerError::FatalConfig(format!(
                "no contract deployed at {}",
                self.config.contract
            )));
        }

        debug!(
            "Contract {} has {} bytes of code",
            self.config.contract,
            code.len().saturating_sub(2) / 2
        );
        Ok(())
    }

    /// Sends a single JSON-RPC call and decodes its result.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
        match self.request(method, params).await? {
            Ok(result) => decode_result(method, result),
            Err(error) => Err(classify_rpc_error(method, &error)),
        }
    }

    /// Sends a JSON-RPC request.
    ///
    /// The outer error covers transport and HTTP failures; the inner one is
    /// the node's JSON-RPC error object, left to the caller to interpret.
    async fn request(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Result<Value, RpcErrorObject>, LedgerError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(method, status));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Transient(format!("invalid {} response: {}", method, e)))?;

        if let Some(error) = body.error {
            return Ok(Err(error));
        }

        body.result
            .map(Ok)
            .ok_or_else(|| LedgerError::Transient(format!("{} returned no result", method)))
    }

    /// Fetches logs for `[from, to]`, halving the queried span whenever the
    /// node refuses a query for matching too many results.
    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        topic_filter: &[B256],
    ) -> Result<Vec<(RpcLog, (u64, u64))>, LedgerError> {
        let mut pending: VecDeque<(u64, u64)> = self.config.chunks(from, to).into();
        let mut logs = Vec::new();

        while let Some((chunk_from, chunk_to)) = pending.pop_front() {
            let filter = json!({
                "address": self.config.contract,
                "fromBlock": format!("{:#x}", chunk_from),
                "toBlock": format!("{:#x}", chunk_to),
                "topics": [topic_filter],
            });

            match self.request("eth_getLogs", json!([filter])).await? {
                Ok(result) => {
                    let chunk: Vec<RpcLog> = decode_result("eth_getLogs", result)?;
                    debug!(
                        "Fetched {} logs for blocks {} to {}",
                        chunk.len(),
                        chunk_from,
                        chunk_to
                    );
                    logs.extend(chunk.into_iter().map(|log| (log, (chunk_from, chunk_to))));
                }
                Err(rpc_error) if rpc_error.code == LIMIT_EXCEEDED && chunk_from < chunk_to => {
                    let mid = chunk_from + (chunk_to - chunk_from) / 2;
                    warn!(
                        "Node refused blocks {} to {} ({}), splitting at {}",
                        chunk_from, chunk_to, rpc_error.message, mid
                    );
                    pending.push_front((mid + 1, chunk_to));
                    pending.push_front((chunk_from, mid));
                }
                Err(rpc_error) => {
                    if rpc_error.code == LIMIT_EXCEEDED {
                        error!(
                            "Block {} alone exceeds the node's log limit, range cannot advance",
                            chunk_from
                        );
                    }
                    return Err(classify_rpc_error("eth_getLogs", &rpc_error));
                }
            }
        }

        Ok(logs)
    }
}

#[async_trait]
impl LedgerReader for JsonRpcLedgerReader {
    async fn current_height(&self) -> Result<u64, LedgerError> {
        let height: U64 = self.call("eth_blockNumber", json!([])).await?;
        Ok(height.to::<u64>())
    }

    async fn get_events(
        &self,
        from: u64,
        to: u64,
        event_names: &[&str],
    ) -> Result<Vec<RawLogEntry>, LedgerError> {
        if from > to {
            return Ok(Vec::new());
        }

        let wanted = event_names
            .iter()
            .map(|name| {
                signature_by_name(name).ok_or_else(|| {
                    LedgerError::FatalConfig(format!("unknown event signature: {}", name))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let topic_filter: Vec<B256> = wanted.iter().map(|sig| sig.topic).collect();

        let mut entries = Vec::new();
        for (log, range) in self.get_logs(from, to, &topic_filter).await? {
            match decode_log(log, &wanted, range) {
                Ok(entry) => entries.push(entry),
                Err(reason) => warn!("Dropping undecodable log: {}", reason),
            }
        }

        entries.sort_by_key(RawLogEntry::position);
        Ok(entries)
    }
}

/// Decodes a JSON-RPC result into the expected type.
fn decode_result<T: DeserializeOwned>(method: &str, result: Value) -> Result<T, LedgerError> {
    serde_json::from_value(result)
        .map_err(|e| LedgerError::Transient(format!("unexpected {} result: {}", method, e)))
}

/// Maps a non-success HTTP status to a ledger error.
fn classify_status(method: &str, status: StatusCode) -> LedgerError {
    let message = format!("{} failed with HTTP {}", method, status);
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        LedgerError::Transient(message)
    } else {
        LedgerError::FatalConfig(message)
    }
}

/// Maps a JSON-RPC error object to a ledger error.
fn classify_rpc_error(method: &str, error: &RpcErrorObject) -> LedgerError {
    let message = format!("{} error [{}]: {}", method, error.code, error.message);
    if error.code == METHOD_NOT_FOUND {
        LedgerError::FatalConfig(message)
    } else {
        LedgerError::Transient(message)
    }
}

/// Turns a node log into a raw entry, or explains why it cannot be used.
fn decode_log(
    log: RpcLog,
    wanted: &[&'static EventSignature],
    range: (u64, u64),
) -> Result<RawLogEntry, String> {
    if log.removed {
        return Err("log was removed by a reorg".to_string());
    }

    let (topic0, indexed) = log.topics.split_first().ok_or("log has no topics")?;
    let signature = wanted
        .iter()
        .find(|sig| &sig.topic == topic0)
        .ok_or_else(|| format!("unrequested event topic {}", topic0))?;

    let block_height = log
        .block_number
        .map(|n| n.to::<u64>())
        .ok_or("log missing block number")?;
    if block_height < range.0 || block_height > range.1 {
        return Err(format!(
            "log at block {} outside requested range {}..={}",
            block_height, range.0, range.1
        ));
    }

    let tx_hash = log.transaction_hash.ok_or("log missing transaction hash")?;
    let log_index = log
        .log_index
        .map(|i| i.to::<u64>())
        .ok_or("log missing log index")?;

    if log.data.len() % 32 != 0 {
        return Err(format!(
            "{} data is {} bytes, not a whole number of words",
            signature.name,
            log.data.len()
        ));
    }

    Ok(RawLogEntry {
        event_name: signature.name.to_string(),
        indexed_args: indexed.to_vec(),
        data_args: log.data.chunks_exact(32).map(B256::from_slice).collect(),
        block_height,
        tx_hash,
        log_index,
    })
}
