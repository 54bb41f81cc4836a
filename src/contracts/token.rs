use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use std::sync::Arc;
use tracing::debug;

use super::bindings::{
    allowanceCall, approveCall, balanceOfCall, buyCall, decimalsCall, mintCall, rateCall,
    symbolCall, transferCall,
};
use crate::error::LedgerError;
use crate::ledger::{CallRequest, Ledger, TxReceipt, TxRequest};
use crate::models::TokenInfo;

/// Typed binding for the ERC20-like token.
pub struct TokenContract<L> {
    ledger: Arc<L>,
    address: Address,
    gas: u64,
}

impl<L: Ledger> TokenContract<L> {
    pub fn new(ledger: Arc<L>, address: Address, gas: u64) -> Self {
        Self {
            ledger,
            address,
            gas,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Legacy tokens return a bare `bytes32` here instead of a `string`.
    pub async fn symbol(&self) -> Result<String, LedgerError> {
        let data = self.read(symbolCall {}.abi_encode()).await?;
        match symbolCall::abi_decode_returns(&data, true) {
            Ok(ret) => Ok(ret._0),
            Err(e) if data.len() == 32 => {
                let trimmed: Vec<u8> = data.iter().copied().take_while(|b| *b != 0).collect();
                String::from_utf8(trimmed).map_err(|_| LedgerError::Abi(e))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Tokens without a `decimals()` getter are treated as whole units.
    pub async fn decimals(&self) -> Result<u8, LedgerError> {
        let data = self.read(decimalsCall {}.abi_encode()).await?;
        if data.is_empty() {
            return Ok(0);
        }
        Ok(decimalsCall::abi_decode_returns(&data, true)?._0)
    }

    pub async fn rate(&self) -> Result<U256, LedgerError> {
        let data = self.read(rateCall {}.abi_encode()).await?;
        Ok(rateCall::abi_decode_returns(&data, true)?._0)
    }

    pub async fn info(&self) -> Result<TokenInfo, LedgerError> {
        let (symbol, decimals) = tokio::try_join!(self.symbol(), self.decimals())?;
        Ok(TokenInfo::new(self.address, &symbol, decimals))
    }

    pub async fn balance_of(&self, owner: Address) -> Result<U256, LedgerError> {
        let data = self.read(balanceOfCall { owner }.abi_encode()).await?;
        Ok(balanceOfCall::abi_decode_returns(&data, true)?._0)
    }

    /// Amount `spender` may still move out of `owner`'s balance.
    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, LedgerError> {
        let data = self
            .read(allowanceCall { owner, spender }.abi_encode())
            .await?;
        Ok(allowanceCall::abi_decode_returns(&data, true)?._0)
    }

    pub async fn approve(
        &self,
        from: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxReceipt, LedgerError> {
        debug!(%from, %spender, %amount, "approve");
        let data = approveCall { spender, amount }.abi_encode();
        self.transact(from, data, U256::ZERO).await
    }

    pub async fn transfer(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxReceipt, LedgerError> {
        debug!(%from, %to, %amount, "transfer");
        let data = transferCall { to, amount }.abi_encode();
        self.transact(from, data, U256::ZERO).await
    }

    pub async fn mint(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxReceipt, LedgerError> {
        debug!(%from, %to, %amount, "mint");
        let data = mintCall { to, amount }.abi_encode();
        self.transact(from, data, U256::ZERO).await
    }

    /// Buy tokens at `rate()` by sending `value` wei.
    pub async fn buy(&self, from: Address, value: U256) -> Result<TxReceipt, LedgerError> {
        debug!(%from, %value, "buy");
        self.transact(from, buyCall {}.abi_encode(), value).await
    }

    async fn read(&self, data: Vec<u8>) -> Result<Vec<u8>, LedgerError> {
        self.ledger
            .call(&CallRequest {
                from: None,
                to: self.address,
                data,
            })
            .await
    }

    async fn transact(
        &self,
        from: Address,
        data: Vec<u8>,
        value: U256,
    ) -> Result<TxReceipt, LedgerError> {
        self.ledger
            .send_transaction(&TxRequest {
                from,
                to: self.address,
                data,
                value,
                gas: Some(self.gas),
            })
            .await
    }
}
