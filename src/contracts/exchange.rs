use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use std::sync::Arc;
use tracing::debug;

use super::bindings::{executeOrderCall, orderBook_Call, submitOrderCall};
use crate::error::LedgerError;
use crate::ledger::{CallRequest, Ledger, TxReceipt, TxRequest};
use crate::models::{Order, OrderId, OrderRequest};

/// Typed binding for the order-book exchange contract.
pub struct Exchange<L> {
    ledger: Arc<L>,
    address: Address,
    gas: u64,
}

impl<L: Ledger> Exchange<L> {
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

    /// Current on-ledger state of `id`. `None` when the exchange holds no
    /// order under that id (a deleted mapping entry reads back as zeros).
    pub async fn order_lookup(&self, id: OrderId) -> Result<Option<Order>, LedgerError> {
        let data = self
            .ledger
            .call(&CallRequest {
                from: None,
                to: self.address,
                data: orderBook_Call { id: id.as_b256() }.abi_encode(),
            })
            .await?;
        let entry = orderBook_Call::abi_decode_returns(&data, true)?;
        if entry.maker == Address::ZERO {
            return Ok(None);
        }
        Ok(Some(Order {
            id,
            maker: entry.maker,
            bid_token: entry.bidToken,
            bid_amount: entry.bidAmount,
            ask_token: entry.askToken,
            ask_amount: entry.askAmount,
        }))
    }

    /// Remaining ask amount of `id`; zero when the order is gone.
    pub async fn remaining_ask(&self, id: OrderId) -> Result<U256, LedgerError> {
        Ok(self
            .order_lookup(id)
            .await?
            .map(|o| o.ask_amount)
            .unwrap_or(U256::ZERO))
    }

    pub async fn submit_order(
        &self,
        from: Address,
        request: &OrderRequest,
    ) -> Result<TxReceipt, LedgerError> {
        debug!(%from, bid = %request.bid_amount, ask = %request.ask_amount, "submitOrder");
        let data = submitOrderCall {
            bidToken: request.bid_token,
            bidAmount: request.bid_amount,
            askToken: request.ask_token,
            askAmount: request.ask_amount,
        }
        .abi_encode();
        self.transact(from, data, U256::ZERO).await
    }

    /// Take `id`, paying `payment` in the native currency.
    pub async fn execute_order(
        &self,
        from: Address,
        id: OrderId,
        payment: U256,
    ) -> Result<TxReceipt, LedgerError> {
        debug!(%from, %id, %payment, "executeOrder");
        let data = executeOrderCall { id: id.as_b256() }.abi_encode();
        self.transact(from, data, payment).await
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
