use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::error::LedgerError;

#[cfg(test)]
pub(crate) mod mock;
pub mod rpc;

pub use rpc::{RpcLedger, RpcOptions};

/// Block selector for log queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Earliest,
    Latest,
    Number(u64),
}

/// Log query: any of `addresses` emitting any of `topics` as topic0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub from_block: BlockTag,
    pub to_block: BlockTag,
    pub addresses: Vec<Address>,
    pub topics: Vec<B256>,
}

impl LogFilter {
    /// Live tail starting at the current head.
    pub fn latest(addresses: Vec<Address>, topics: Vec<B256>) -> Self {
        Self {
            from_block: BlockTag::Latest,
            to_block: BlockTag::Latest,
            addresses,
            topics,
        }
    }

    /// Historical scan from genesis to `head`.
    pub fn history(addresses: Vec<Address>, topics: Vec<B256>, head: u64) -> Self {
        Self {
            from_block: BlockTag::Number(0),
            to_block: BlockTag::Number(head),
            addresses,
            topics,
        }
    }

    /// Same addresses and topics, from `block` up to the current head.
    pub fn since(&self, block: u64) -> Self {
        Self {
            from_block: BlockTag::Number(block),
            to_block: BlockTag::Latest,
            addresses: self.addresses.clone(),
            topics: self.topics.clone(),
        }
    }

    pub fn matches(&self, log: &RawLog) -> bool {
        let address_ok = self.addresses.is_empty() || self.addresses.contains(&log.address);
        let topic_ok = self.topics.is_empty()
            || log
                .topics
                .first()
                .map(|t| self.topics.contains(t))
                .unwrap_or(false);
        address_ok && topic_ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Vec<u8>,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<B256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Vec<u8>,
}

/// A state-changing call signed by the node for one of its accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub data: Vec<u8>,
    pub value: U256,
    pub gas: Option<u64>,
}

/// A mined, successful transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub logs: Vec<RawLog>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterId(pub String);

/// Capability set of a ledger node.
///
/// Transport, signing and network selection live behind this trait; every
/// method is one request whose outcome is a typed `Result`.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn network_id(&self) -> Result<String, LedgerError>;

    async fn accounts(&self) -> Result<Vec<Address>, LedgerError>;

    async fn balance(&self, address: Address) -> Result<U256, LedgerError>;

    async fn block_number(&self) -> Result<u64, LedgerError>;

    /// Read-only contract call; returns the raw return data.
    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, LedgerError>;

    /// Send a transaction and wait until it is mined. A reverted transaction
    /// is reported as [`LedgerError::Reverted`].
    async fn send_transaction(&self, request: &TxRequest) -> Result<TxReceipt, LedgerError>;

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, LedgerError>;

    async fn install_filter(&self, filter: &LogFilter) -> Result<FilterId, LedgerError>;

    /// Logs matching the filter since the previous poll.
    async fn filter_changes(&self, id: &FilterId) -> Result<Vec<RawLog>, LedgerError>;

    async fn uninstall_filter(&self, id: &FilterId) -> Result<bool, LedgerError>;
}
