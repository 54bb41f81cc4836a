use alloy_primitives::{Address, B256, U256};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Exchange-assigned order identifier: the 32-byte hash of the order params.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OrderId(pub B256);

impl OrderId {
    pub fn as_b256(&self) -> B256 {
        self.0
    }
}

impl From<B256> for OrderId {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::utils::to_hex(self.0.as_slice()))
    }
}

impl FromStr for OrderId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = crate::utils::decode_hex(s)?;
        if bytes.len() != 32 {
            return Err(anyhow::anyhow!(
                "order id must be 32 bytes, got {}",
                bytes.len()
            ));
        }
        Ok(Self(B256::from_slice(&bytes)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    /// Executed or removed: the exchange no longer resolves a remaining ask.
    Closed,
}

/// A maker's standing offer on the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub maker: Address,
    /// Token offered for sale
    pub bid_token: Address,
    pub bid_amount: U256,
    /// Token requested; `Address::ZERO` is the native currency
    pub ask_token: Address,
    pub ask_amount: U256,
}

impl Order {
    /// Derived status. A settled order reads back from the exchange with a
    /// zero ask amount.
    pub fn status(&self) -> OrderStatus {
        if self.ask_amount.is_zero() {
            OrderStatus::Closed
        } else {
            OrderStatus::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.status() == OrderStatus::Open
    }

    pub fn asks_native(&self) -> bool {
        self.ask_token == Address::ZERO
    }
}

/// Parameters of a new order, in base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub bid_token: Address,
    pub bid_amount: U256,
    pub ask_token: Address,
    pub ask_amount: U256,
}

impl OrderRequest {
    /// Sell `bid_amount` of `token` for `ask_amount` of the native currency.
    pub fn for_native(token: Address, bid_amount: U256, ask_amount: U256) -> Self {
        Self {
            bid_token: token,
            bid_amount,
            ask_token: Address::ZERO,
            ask_amount,
        }
    }
}
