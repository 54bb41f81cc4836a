use alloy_primitives::{Address, U256};
use serde::Serialize;

/// Last known balances of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    pub account: Address,
    pub native: U256,
    pub token: U256,
}
