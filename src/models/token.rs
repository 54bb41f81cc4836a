use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Decimal places of the native currency (wei per ether).
pub const NATIVE_DECIMALS: u8 = 18;
pub const NATIVE_SYMBOL: &str = "ETH";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    pub fn new(address: Address, symbol: &str, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.to_string(),
            decimals,
        }
    }

    /// Symbol and decimals for `token`, falling back to the native currency
    /// for the zero address and the raw address for unknown tokens.
    pub fn describe(&self, token: &Address) -> (String, u8) {
        if *token == Address::ZERO {
            (NATIVE_SYMBOL.to_string(), NATIVE_DECIMALS)
        } else if *token == self.address {
            (self.symbol.clone(), self.decimals)
        } else {
            (crate::utils::to_hex(token.as_slice()), 0)
        }
    }
}
