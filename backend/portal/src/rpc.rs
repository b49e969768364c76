//! Ethereum JSON-RPC client for the paper registry contract.
//!
//! ## Resilience
//!
//! * Transport failures and rate-limit responses are retried with exponential
//!   back-off, up to `rpc_max_retries` attempts.
//! * JSON-RPC errors (reverts, unknown methods, bad params) are deterministic
//!   and surface immediately as [`PortalError::ContractCallFailed`].
//! * `eth_sendTransaction` is never retried. If its response is lost the
//!   transaction may still be in flight, and the error says so.
//! * Receipt polling rides out failed polls until the confirmation deadline.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::abi::{self, ContractWrite};
use crate::config::Config;
use crate::errors::{PortalError, Result};
use crate::registry::{PaperRegistry, TxReceipt};
use crate::types::{Paper, Version};

const INITIAL_BACKOFF_MS: u64 = 250;
const MAX_BACKOFF_MS: u64 = 4_000;

enum Attempt {
    Done(Value),
    /// Transport failure or rate limit; the request may be repeated.
    Transient(String),
}

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Value,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RawReceipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: Option<String>,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
    /// `0x1` on success, `0x0` when the transaction reverted.
    pub status: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────

pub struct RpcRegistry {
    client: Client,
    rpc_url: String,
    contract: Address,
    max_retries: u32,
    poll_interval: Duration,
    confirm_timeout: Duration,
}

impl RpcRegistry {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            rpc_url: config.rpc_url.clone(),
            contract: config.contract_address,
            max_retries: config.rpc_max_retries.max(1),
            poll_interval: config.tx_poll_interval(),
            confirm_timeout: config.tx_confirm_timeout(),
        }
    }

    /// Issue one JSON-RPC request, retrying transient transport failures.
    ///
    /// Only for requests that are safe to repeat; see [`Self::request_once`].
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let mut backoff = INITIAL_BACKOFF_MS;
        let mut attempt = 1;

        loop {
            let retry_reason = match self.attempt(method, &params).await? {
                Attempt::Done(result) => {
                    debug!(method, attempt, "RPC call succeeded");
                    return Ok(result);
                }
                Attempt::Transient(reason) => reason,
            };

            if attempt >= self.max_retries {
                return Err(PortalError::ContractCallFailed(format!(
                    "{method}: {retry_reason} (gave up after {attempt} attempts)"
                )));
            }
            warn!("{method}: {retry_reason} (will retry in {backoff}ms)");
            tokio::time::sleep(Duration::from_millis(backoff)).await;
            backoff = (backoff * 2).min(MAX_BACKOFF_MS);
            attempt += 1;
        }
    }

    /// Issue a request exactly once.
    ///
    /// A lost response leaves the outcome unknown: the node may already have
    /// accepted a broadcast, so repeating it could submit it twice.
    async fn request_once(&self, method: &str, params: Value) -> Result<Value> {
        match self.attempt(method, &params).await? {
            Attempt::Done(result) => Ok(result),
            Attempt::Transient(reason) => Err(PortalError::ContractCallFailed(format!(
                "{method}: {reason}; outcome unknown, the node may have accepted it"
            ))),
        }
    }

    /// One round trip. JSON-RPC errors and malformed bodies are `Err`.
    async fn attempt(&self, method: &str, params: &Value) -> Result<Attempt> {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await;

        let resp = match response {
            Err(e) => return Ok(Attempt::Transient(format!("request failed: {e}"))),
            Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                return Ok(Attempt::Transient("rate-limited by RPC".to_string()));
            }
            Ok(resp) => resp,
        };

        let body: RpcResponse = resp.json().await.map_err(|e| {
            PortalError::ContractCallFailed(format!("{method}: malformed response: {e}"))
        })?;
        if let Some(err) = body.error {
            return Err(PortalError::ContractCallFailed(format!(
                "{method} error {}: {}",
                err.code, err.message
            )));
        }
        Ok(Attempt::Done(body.result))
    }

    async fn call(&self, method: &str, data: Vec<u8>) -> Result<Vec<u8>> {
        let result = self
            .request("eth_call", build_call_params(self.contract, &data))
            .await
            .map_err(|e| annotate(e, method))?;
        let raw = result.as_str().ok_or_else(|| {
            PortalError::ContractCallFailed(format!("{method}: eth_call returned no data"))
        })?;
        decode_hex(raw)
    }
}

#[async_trait]
impl PaperRegistry for RpcRegistry {
    async fn owner(&self) -> Result<Address> {
        let data = self.call("owner", abi::encode_owner()).await?;
        abi::decode_owner(&data)
    }

    async fn is_auditor(&self, account: Address) -> Result<bool> {
        let data = self.call("auditors", abi::encode_auditors(account)).await?;
        abi::decode_auditors(&data)
    }

    async fn paper_count(&self) -> Result<u64> {
        let data = self.call("paperCount", abi::encode_paper_count()).await?;
        abi::decode_paper_count(&data)
    }

    async fn paper_info(&self, paper_id: u64) -> Result<Paper> {
        let data = self
            .call("getPaperInfo", abi::encode_paper_info(paper_id))
            .await?;
        abi::decode_paper_info(paper_id, &data)
    }

    async fn version(&self, paper_id: u64, index: u64) -> Result<Version> {
        let data = self
            .call("getVersion", abi::encode_version(paper_id, index))
            .await?;
        abi::decode_version(paper_id, index, &data)
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        let result = self.request("eth_accounts", json!([])).await?;
        parse_accounts(&result)
    }

    async fn sign_message(&self, from: Address, message: &[u8]) -> Result<Bytes> {
        let result = self
            .request("personal_sign", json!([to_hex(message), to_hex(from)]))
            .await?;
        let raw = result.as_str().ok_or_else(|| {
            PortalError::ContractCallFailed("personal_sign returned no signature".to_string())
        })?;
        Ok(Bytes::from(decode_hex(raw)?))
    }

    async fn send(&self, from: Address, call: &ContractWrite) -> Result<B256> {
        let params = json!([{
            "from": to_hex(from),
            "to": to_hex(self.contract),
            "data": to_hex(call.encode()),
        }]);
        let result = self
            .request_once("eth_sendTransaction", params)
            .await
            .map_err(|e| annotate(e, call.method()))?;
        let hash = result
            .as_str()
            .and_then(|s| s.parse::<B256>().ok())
            .ok_or_else(|| {
                PortalError::ContractCallFailed(format!(
                    "{}: node returned no transaction hash",
                    call.method()
                ))
            })?;
        info!("Submitted {} transaction {}", call.method(), to_hex(hash));
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt> {
        let deadline = tokio::time::Instant::now() + self.confirm_timeout;
        let params = json!([to_hex(tx_hash)]);

        // Only a receipt, a revert or the deadline ends the wait.
        loop {
            match self.attempt("eth_getTransactionReceipt", &params).await {
                Ok(Attempt::Done(result)) => {
                    if let Some(receipt) = parse_receipt(tx_hash, result)? {
                        info!(
                            "Transaction {} confirmed in block {:?}",
                            to_hex(tx_hash),
                            receipt.block_number
                        );
                        return Ok(receipt);
                    }
                }
                Ok(Attempt::Transient(reason)) => {
                    warn!("Receipt poll for {}: {reason}", to_hex(tx_hash));
                }
                Err(e) => warn!("Receipt poll for {}: {e}", to_hex(tx_hash)),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(PortalError::ContractCallFailed(format!(
                    "transaction {} not confirmed within {}ms",
                    to_hex(tx_hash),
                    self.confirm_timeout.as_millis()
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

// ─────────────────────────────────────────────────────────
// Payload helpers
// ─────────────────────────────────────────────────────────

fn build_call_params(contract: Address, data: &[u8]) -> Value {
    json!([
        {
            "to": to_hex(contract),
            "data": to_hex(data),
        },
        "latest"
    ])
}

/// Interpret an `eth_getTransactionReceipt` result.
///
/// `null` means the transaction is still pending.
fn parse_receipt(tx_hash: B256, result: Value) -> Result<Option<TxReceipt>> {
    if result.is_null() {
        return Ok(None);
    }
    let raw: RawReceipt = serde_json::from_value(result)?;

    if raw.status.as_deref().map(parse_quantity) == Some(Some(0)) {
        return Err(PortalError::ContractCallFailed(format!(
            "transaction {} reverted",
            to_hex(tx_hash)
        )));
    }

    Ok(Some(TxReceipt {
        tx_hash: raw
            .transaction_hash
            .and_then(|h| h.parse().ok())
            .unwrap_or(tx_hash),
        block_number: raw.block_number.as_deref().and_then(parse_quantity),
    }))
}

fn parse_accounts(result: &Value) -> Result<Vec<Address>> {
    let list = result.as_array().ok_or_else(|| {
        PortalError::ContractCallFailed("eth_accounts returned a non-array".to_string())
    })?;
    list.iter()
        .filter_map(Value::as_str)
        .map(|s| {
            s.parse::<Address>().map_err(|_| {
                PortalError::ContractCallFailed(format!("eth_accounts returned bad address {s}"))
            })
        })
        .collect()
}

fn annotate(err: PortalError, method: &str) -> PortalError {
    match err {
        PortalError::ContractCallFailed(msg) => {
            PortalError::ContractCallFailed(format!("{method}: {msg}"))
        }
        other => other,
    }
}

fn to_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn decode_hex(raw: &str) -> Result<Vec<u8>> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits)
        .map_err(|e| PortalError::ContractCallFailed(format!("invalid hex in RPC response: {e}")))
}

/// Parse a JSON-RPC quantity such as `0x1b4`.
fn parse_quantity(raw: &str) -> Option<u64> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16).ok()
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
