//! Error types for ledger access and order-book synchronisation.

use alloy_primitives::B256;
use thiserror::Error;

/// Failures talking to the ledger node.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rate limited by ledger node")]
    RateLimited,

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed RPC response: {0}")]
    Decode(String),

    #[error("ABI decode error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },
}

impl LedgerError {
    /// The node no longer knows the polled filter (restart or expiry).
    pub fn is_filter_not_found(&self) -> bool {
        matches!(self, LedgerError::Rpc { message, .. } if message.contains("filter not found"))
    }
}

/// Failures surfaced by [`crate::sync::OrderBookSync`] and the session layer.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Phase one of a submission (the allowance grant) was confirmed but the
    /// order itself was not. The allowance stays in place on the ledger.
    #[error("order submission failed after allowance {approve_tx} was granted (allowance remains): {source}")]
    LeakedAllowance {
        approve_tx: B256,
        #[source]
        source: LedgerError,
    },

    #[error("submission {tx_hash} confirmed without an order event")]
    MissingOrderEvent { tx_hash: B256 },

    #[error("ledger exposes no accounts")]
    NoAccounts,

    #[error("account index {index} out of range ({available} available)")]
    UnknownAccount { index: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, SyncError>;
