use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

use super::{
    BlockTag, CallRequest, FilterId, Ledger, LogFilter, RawLog, TxReceipt, TxRequest,
};
use crate::error::LedgerError;
use crate::utils::{decode_hex, parse_quantity, parse_quantity_u64, quantity, to_hex};

const READ_RETRY_BASE_MS: u64 = 250;

#[derive(Debug, Clone)]
pub struct RpcOptions {
    /// Per-request HTTP timeout. Receipt waiting itself has no deadline.
    pub timeout: Duration,
    pub receipt_poll: Duration,
    /// Retries for read-only requests. Transactions are never retried.
    pub read_retries: u32,
}

impl Default for RpcOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            receipt_poll: Duration::from_millis(500),
            read_retries: 3,
        }
    }
}

/// JSON-RPC 2.0 client for an Ethereum-style node over HTTP.
pub struct RpcLedger {
    api_url: String,
    client: reqwest::Client,
    options: RpcOptions,
    next_id: AtomicU64,
}

impl RpcLedger {
    pub fn new(api_url: &str, options: RpcOptions) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder().timeout(options.timeout).build()?;
        Ok(Self::with_client(api_url, client, options))
    }

    pub fn with_client(api_url: &str, client: reqwest::Client, options: RpcOptions) -> Self {
        Self {
            api_url: crate::utils::remove_trailing_slash(api_url),
            client,
            options,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(method, id, "rpc request");
        let response = self.client.post(&self.api_url).json(&body).send().await?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LedgerError::RateLimited);
        }
        let envelope: RpcResponse = response.json().await?;
        if let Some(error) = envelope.error {
            return Err(LedgerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }

    /// Read-only request, retried with backoff.
    async fn read<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
        let value = crate::utils::retry(self.options.read_retries, READ_RETRY_BASE_MS, || {
            self.request(method, params.clone())
        })
        .await?;
        serde_json::from_value(value)
            .map_err(|e| LedgerError::Decode(format!("{}: {}", method, e)))
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt, LedgerError> {
        loop {
            let receipt: Option<RpcReceipt> = self
                .read("eth_getTransactionReceipt", json!([to_hex(tx_hash.as_slice())]))
                .await?;
            match receipt {
                Some(receipt) => return receipt_from_rpc(receipt),
                None => {
                    debug!(tx = %tx_hash, "waiting for receipt");
                    tokio::time::sleep(self.options.receipt_poll).await;
                }
            }
        }
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn network_id(&self) -> Result<String, LedgerError> {
        self.read("net_version", json!([])).await
    }

    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        self.read("eth_accounts", json!([])).await
    }

    async fn balance(&self, address: Address) -> Result<U256, LedgerError> {
        let raw: String = self
            .read("eth_getBalance", json!([to_hex(address.as_slice()), "latest"]))
            .await?;
        parse_quantity(&raw).map_err(decode_error)
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        let raw: String = self.read("eth_blockNumber", json!([])).await?;
        parse_quantity_u64(&raw).map_err(decode_error)
    }

    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, LedgerError> {
        let raw: String = self
            .read("eth_call", json!([call_params(request), "latest"]))
            .await?;
        decode_hex(&raw).map_err(decode_error)
    }

    async fn send_transaction(&self, request: &TxRequest) -> Result<TxReceipt, LedgerError> {
        let value = self
            .request("eth_sendTransaction", json!([tx_params(request)]))
            .await?;
        let tx_hash: B256 = serde_json::from_value(value)
            .map_err(|e| LedgerError::Decode(format!("eth_sendTransaction: {}", e)))?;
        debug!(tx = %tx_hash, from = %request.from, to = %request.to, "transaction sent");
        self.wait_for_receipt(tx_hash).await
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, LedgerError> {
        let logs: Vec<RpcLog> = self.read("eth_getLogs", json!([filter_params(filter)])).await?;
        logs_from_rpc(logs)
    }

    /// Not retried: a retry after a lost response would leave a second
    /// filter installed on the node.
    async fn install_filter(&self, filter: &LogFilter) -> Result<FilterId, LedgerError> {
        let value = self
            .request("eth_newFilter", json!([filter_params(filter)]))
            .await?;
        let id: String = serde_json::from_value(value)
            .map_err(|e| LedgerError::Decode(format!("eth_newFilter: {}", e)))?;
        Ok(FilterId(id))
    }

    async fn filter_changes(&self, id: &FilterId) -> Result<Vec<RawLog>, LedgerError> {
        let logs: Vec<RpcLog> = self.read("eth_getFilterChanges", json!([id.0])).await?;
        logs_from_rpc(logs)
    }

    async fn uninstall_filter(&self, id: &FilterId) -> Result<bool, LedgerError> {
        self.read("eth_uninstallFilter", json!([id.0])).await
    }
}

// ── Wire format ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: String,
    block_number: Option<String>,
    transaction_hash: Option<B256>,
    #[serde(default)]
    removed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    block_number: Option<String>,
    /// Absent on pre-Byzantium chains; treated as success.
    status: Option<String>,
    #[serde(default)]
    logs: Vec<RpcLog>,
}

fn decode_error(e: anyhow::Error) -> LedgerError {
    LedgerError::Decode(e.to_string())
}

fn block_tag(tag: BlockTag) -> Value {
    match tag {
        BlockTag::Earliest => json!("earliest"),
        BlockTag::Latest => json!("latest"),
        BlockTag::Number(n) => json!(format!("0x{:x}", n)),
    }
}

fn filter_params(filter: &LogFilter) -> Value {
    let addresses: Vec<String> = filter.addresses.iter().map(|a| to_hex(a.as_slice())).collect();
    let topics: Vec<String> = filter.topics.iter().map(|t| to_hex(t.as_slice())).collect();
    json!({
        "fromBlock": block_tag(filter.from_block),
        "toBlock": block_tag(filter.to_block),
        "address": addresses,
        "topics": [topics],
    })
}

fn call_params(request: &CallRequest) -> Value {
    let mut params = json!({
        "to": to_hex(request.to.as_slice()),
        "data": to_hex(&request.data),
    });
    if let Some(from) = request.from {
        params["from"] = json!(to_hex(from.as_slice()));
    }
    params
}

fn tx_params(request: &TxRequest) -> Value {
    let mut params = json!({
        "from": to_hex(request.from.as_slice()),
        "to": to_hex(request.to.as_slice()),
        "data": to_hex(&request.data),
        "value": quantity(request.value),
    });
    if let Some(gas) = request.gas {
        params["gas"] = json!(format!("0x{:x}", gas));
    }
    params
}

fn log_from_rpc(log: RpcLog) -> Result<RawLog, LedgerError> {
    let block_number = log
        .block_number
        .as_deref()
        .map(parse_quantity_u64)
        .transpose()
        .map_err(decode_error)?;
    Ok(RawLog {
        address: log.address,
        topics: log.topics,
        data: decode_hex(&log.data).map_err(decode_error)?,
        block_number,
        transaction_hash: log.transaction_hash,
    })
}

/// Logs dropped by a reorg come back with `removed: true` and are skipped.
fn logs_from_rpc(logs: Vec<RpcLog>) -> Result<Vec<RawLog>, LedgerError> {
    logs.into_iter()
        .filter(|log| !log.removed)
        .map(log_from_rpc)
        .collect()
}

fn receipt_from_rpc(receipt: RpcReceipt) -> Result<TxReceipt, LedgerError> {
    if let Some(status) = receipt.status.as_deref() {
        if parse_quantity_u64(status).map_err(decode_error)? == 0 {
            return Err(LedgerError::Reverted {
                tx_hash: receipt.transaction_hash,
            });
        }
    }
    let block_number = receipt
        .block_number
        .as_deref()
        .map(parse_quantity_u64)
        .transpose()
        .map_err(decode_error)?;
    Ok(TxReceipt {
        transaction_hash: receipt.transaction_hash,
        block_number,
        logs: logs_from_rpc(receipt.logs)?,
    })
}
