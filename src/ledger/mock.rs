//! In-memory ledger emulating the token and exchange contracts for tests.

use alloy_primitives::{keccak256, Address, LogData, B256, U256};
use alloy_sol_types::{SolCall, SolEvent, SolValue};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{BlockTag, CallRequest, FilterId, Ledger, LogFilter, RawLog, TxReceipt, TxRequest};
use crate::contracts::bindings::{
    allowanceCall, approveCall, balanceOfCall, buyCall, decimalsCall, executeOrderCall,
    mintCall, orderBook_Call, rateCall, submitOrderCall, symbolCall, transferCall,
    LogErrorString, LogTokensMinted, OrderExecuted, OrderSubmitted, Transfer,
};
use crate::error::LedgerError;
use crate::models::{Order, OrderId};

pub struct MockLedger {
    state: Mutex<State>,
}

struct State {
    accounts: Vec<Address>,
    token: Address,
    exchange: Address,
    block: u64,
    nonce: u64,
    offline: bool,
    reject_submissions: bool,
    native: HashMap<Address, U256>,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    orders: HashMap<B256, Order>,
    logs: Vec<RawLog>,
    filters: HashMap<String, (LogFilter, usize)>,
    next_filter: u64,
    sent: Vec<TxRequest>,
    lookups: usize,
}

fn revert(tx_hash: B256) -> LedgerError {
    LedgerError::Reverted { tx_hash }
}

fn selector(data: &[u8]) -> [u8; 4] {
    let mut sel = [0u8; 4];
    if data.len() >= 4 {
        sel.copy_from_slice(&data[..4]);
    }
    sel
}

fn raw_log(address: Address, encoded: LogData) -> RawLog {
    RawLog {
        address,
        topics: encoded.topics().to_vec(),
        data: encoded.data.to_vec(),
        block_number: None,
        transaction_hash: None,
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                accounts: (1..=3).map(Address::repeat_byte).collect(),
                token: Address::repeat_byte(0x70),
                exchange: Address::repeat_byte(0xee),
                block: 1,
                nonce: 0,
                offline: false,
                reject_submissions: false,
                native: HashMap::new(),
                balances: HashMap::new(),
                allowances: HashMap::new(),
                orders: HashMap::new(),
                logs: Vec::new(),
                filters: HashMap::new(),
                next_filter: 1,
                sent: Vec::new(),
                lookups: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn online(&self) -> Result<MutexGuard<'_, State>, LedgerError> {
        let state = self.lock();
        if state.offline {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: "ledger offline".to_string(),
            });
        }
        Ok(state)
    }

    pub fn account(&self, index: usize) -> Address {
        self.lock().accounts[index]
    }

    pub fn token_address(&self) -> Address {
        self.lock().token
    }

    pub fn exchange_address(&self) -> Address {
        self.lock().exchange
    }

    pub fn set_native_balance(&self, account: Address, value: U256) {
        self.lock().native.insert(account, value);
    }

    pub fn set_token_balance(&self, account: Address, value: U256) {
        self.lock().balances.insert(account, value);
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Make every `submitOrder` revert.
    pub fn reject_submissions(&self, reject: bool) {
        self.lock().reject_submissions = reject;
    }

    pub fn token_balance(&self, account: Address) -> U256 {
        self.lock().balances.get(&account).copied().unwrap_or_default()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.lock()
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn sent_transactions(&self) -> Vec<TxRequest> {
        self.lock().sent.clone()
    }

    pub fn lookups(&self) -> usize {
        self.lock().lookups
    }

    pub fn installed_filters(&self) -> usize {
        self.lock().filters.len()
    }

    /// Place an order on the exchange directly, emitting its event, without
    /// going through allowance and escrow.
    pub fn seed_order(&self, maker: Address, bid_amount: u64, ask_amount: u64) -> Order {
        let mut state = self.lock();
        let order = Order {
            id: OrderId(B256::ZERO),
            maker,
            bid_token: state.token,
            bid_amount: U256::from(bid_amount),
            ask_token: Address::ZERO,
            ask_amount: U256::from(ask_amount),
        };
        let order = state.store_order(order);
        let log = state.submitted_log(&order);
        let tx_hash = state.next_hash();
        state.mine(vec![log], tx_hash);
        order
    }

    /// Settle an order on the ledger without emitting `OrderExecuted`, as if
    /// the execution event was never delivered.
    pub fn settle_silently(&self, id: OrderId) {
        self.lock().orders.remove(&id.0);
    }

    /// Re-emit a submission log for an existing order (duplicate delivery).
    pub fn replay_submitted(&self, order: &Order) {
        let mut state = self.lock();
        let log = state.submitted_log(order);
        let tx_hash = state.next_hash();
        state.mine(vec![log], tx_hash);
    }

    /// Drop every installed filter on the node side, as a node restart would.
    pub fn forget_filters(&self) {
        self.lock().filters.clear();
    }

    pub fn emit_error_string(&self, message: &str) {
        let mut state = self.lock();
        let error = LogErrorString {
            message: message.to_string(),
        };
        let log = raw_log(state.token, error.encode_log_data());
        let tx_hash = state.next_hash();
        state.mine(vec![log], tx_hash);
    }
}

impl State {
    fn next_hash(&mut self) -> B256 {
        self.nonce += 1;
        keccak256(self.nonce.to_be_bytes())
    }

    fn mine(&mut self, mut logs: Vec<RawLog>, tx_hash: B256) -> TxReceipt {
        self.block += 1;
        for log in logs.iter_mut() {
            log.block_number = Some(self.block);
            log.transaction_hash = Some(tx_hash);
        }
        self.logs.extend(logs.iter().cloned());
        TxReceipt {
            transaction_hash: tx_hash,
            block_number: Some(self.block),
            logs,
        }
    }

    fn store_order(&mut self, mut order: Order) -> Order {
        self.nonce += 1;
        let preimage = (
            order.maker,
            order.bid_token,
            order.bid_amount,
            order.ask_token,
            order.ask_amount,
            U256::from(self.nonce),
        )
            .abi_encode();
        order.id = OrderId(keccak256(preimage));
        self.orders.insert(order.id.0, order.clone());
        order
    }

    fn submitted_log(&self, order: &Order) -> RawLog {
        let event = OrderSubmitted {
            id: order.id.0,
            maker: order.maker,
            bidToken: order.bid_token,
            bidAmount: order.bid_amount,
            askToken: order.ask_token,
            askAmount: order.ask_amount,
        };
        raw_log(self.exchange, event.encode_log_data())
    }

    fn executed_log(&self, order: &Order, taker: Address) -> RawLog {
        let event = OrderExecuted {
            id: order.id.0,
            maker: order.maker,
            taker,
            bidToken: order.bid_token,
            bidAmount: order.bid_amount,
            askToken: order.ask_token,
            askAmount: order.ask_amount,
        };
        raw_log(self.exchange, event.encode_log_data())
    }

    fn transfer_log(&self, from: Address, to: Address, value: U256) -> RawLog {
        raw_log(self.token, Transfer { from, to, value }.encode_log_data())
    }

    fn minted_log(&self, to: Address, amount: U256) -> RawLog {
        raw_log(self.token, LogTokensMinted { to, amount }.encode_log_data())
    }

    fn move_tokens(&mut self, from: Address, to: Address, amount: U256) -> bool {
        let balance = self.balances.get(&from).copied().unwrap_or_default();
        if balance < amount {
            return false;
        }
        self.balances.insert(from, balance - amount);
        *self.balances.entry(to).or_default() += amount;
        true
    }

    fn move_native(&mut self, from: Address, to: Address, amount: U256) -> bool {
        let balance = self.native.get(&from).copied().unwrap_or_default();
        if balance < amount {
            return false;
        }
        self.native.insert(from, balance - amount);
        *self.native.entry(to).or_default() += amount;
        true
    }

    fn token_tx(&mut self, tx: &TxRequest, tx_hash: B256) -> Result<Vec<RawLog>, LedgerError> {
        let sel = selector(&tx.data);
        if sel == approveCall::SELECTOR {
            let call = approveCall::abi_decode(&tx.data, true)?;
            self.allowances.insert((tx.from, call.spender), call.amount);
            Ok(vec![])
        } else if sel == transferCall::SELECTOR {
            let call = transferCall::abi_decode(&tx.data, true)?;
            if !self.move_tokens(tx.from, call.to, call.amount) {
                return Err(revert(tx_hash));
            }
            Ok(vec![self.transfer_log(tx.from, call.to, call.amount)])
        } else if sel == mintCall::SELECTOR {
            let call = mintCall::abi_decode(&tx.data, true)?;
            *self.balances.entry(call.to).or_default() += call.amount;
            Ok(vec![self.minted_log(call.to, call.amount)])
        } else if sel == buyCall::SELECTOR {
            let amount = tx.value * U256::from(1000u64);
            *self.balances.entry(tx.from).or_default() += amount;
            Ok(vec![self.minted_log(tx.from, amount)])
        } else {
            Err(revert(tx_hash))
        }
    }

    fn exchange_tx(&mut self, tx: &TxRequest, tx_hash: B256) -> Result<Vec<RawLog>, LedgerError> {
        let sel = selector(&tx.data);
        if sel == submitOrderCall::SELECTOR {
            if self.reject_submissions {
                return Err(revert(tx_hash));
            }
            let call = submitOrderCall::abi_decode(&tx.data, true)?;
            let order = Order {
                id: OrderId(B256::ZERO),
                maker: tx.from,
                bid_token: call.bidToken,
                bid_amount: call.bidAmount,
                ask_token: call.askToken,
                ask_amount: call.askAmount,
            };
            let exchange = self.exchange;
            let allowance = self
                .allowances
                .get(&(tx.from, exchange))
                .copied()
                .unwrap_or_default();
            if allowance < order.bid_amount {
                return Err(revert(tx_hash));
            }
            if !self.move_tokens(tx.from, exchange, order.bid_amount) {
                return Err(revert(tx_hash));
            }
            self.allowances
                .insert((tx.from, exchange), allowance - order.bid_amount);
            let order = self.store_order(order);
            Ok(vec![self.submitted_log(&order)])
        } else if sel == executeOrderCall::SELECTOR {
            let call = executeOrderCall::abi_decode(&tx.data, true)?;
            let order = match self.orders.get(&call.id) {
                Some(o) if o.is_open() && o.ask_amount == tx.value => o.clone(),
                _ => return Err(revert(tx_hash)),
            };
            if !self.move_native(tx.from, order.maker, order.ask_amount) {
                return Err(revert(tx_hash));
            }
            let exchange = self.exchange;
            self.move_tokens(exchange, tx.from, order.bid_amount);
            self.orders.remove(&call.id);
            Ok(vec![self.executed_log(&order, tx.from)])
        } else {
            Err(revert(tx_hash))
        }
    }

    fn read(&mut self, call: &CallRequest) -> Result<Vec<u8>, LedgerError> {
        let data = &call.data;
        let sel = selector(data);
        if call.to == self.exchange && sel == orderBook_Call::SELECTOR {
            self.lookups += 1;
            let id = orderBook_Call::abi_decode(data, true)?.id;
            let entry = match self.orders.get(&id) {
                Some(o) => (o.maker, o.bid_token, o.bid_amount, o.ask_token, o.ask_amount),
                None => (Address::ZERO, Address::ZERO, U256::ZERO, Address::ZERO, U256::ZERO),
            };
            return Ok(orderBook_Call::abi_encode_returns(&entry));
        }
        if call.to == self.token {
            if sel == balanceOfCall::SELECTOR {
                let owner = balanceOfCall::abi_decode(data, true)?.owner;
                let balance = self.balances.get(&owner).copied().unwrap_or_default();
                return Ok(balanceOfCall::abi_encode_returns(&(balance,)));
            }
            if sel == allowanceCall::SELECTOR {
                let query = allowanceCall::abi_decode(data, true)?;
                let value = self
                    .allowances
                    .get(&(query.owner, query.spender))
                    .copied()
                    .unwrap_or_default();
                return Ok(allowanceCall::abi_encode_returns(&(value,)));
            }
            if sel == symbolCall::SELECTOR {
                return Ok(symbolCall::abi_encode_returns(&("BLG".to_string(),)));
            }
            if sel == decimalsCall::SELECTOR {
                return Ok(decimalsCall::abi_encode_returns(&(2u8,)));
            }
            if sel == rateCall::SELECTOR {
                return Ok(rateCall::abi_encode_returns(&(U256::from(1000u64),)));
            }
        }
        Err(LedgerError::Rpc {
            code: -32000,
            message: "execution reverted".to_string(),
        })
    }

    fn block_of(&self, tag: BlockTag) -> u64 {
        match tag {
            BlockTag::Earliest => 0,
            BlockTag::Latest => self.block,
            BlockTag::Number(n) => n,
        }
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn network_id(&self) -> Result<String, LedgerError> {
        let _state = self.online()?;
        Ok("5777".to_string())
    }

    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        Ok(self.online()?.accounts.clone())
    }

    async fn balance(&self, address: Address) -> Result<U256, LedgerError> {
        Ok(self.online()?.native.get(&address).copied().unwrap_or_default())
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        Ok(self.online()?.block)
    }

    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, LedgerError> {
        // Let concurrent lookups interleave like real network calls.
        tokio::task::yield_now().await;
        self.online()?.read(request)
    }

    async fn send_transaction(&self, request: &TxRequest) -> Result<TxReceipt, LedgerError> {
        let mut state = self.online()?;
        state.sent.push(request.clone());
        let tx_hash = state.next_hash();
        let logs = if request.to == state.token {
            state.token_tx(request, tx_hash)?
        } else if request.to == state.exchange {
            state.exchange_tx(request, tx_hash)?
        } else {
            return Err(revert(tx_hash));
        };
        Ok(state.mine(logs, tx_hash))
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, LedgerError> {
        let state = self.online()?;
        let from = state.block_of(filter.from_block);
        let to = state.block_of(filter.to_block);
        Ok(state
            .logs
            .iter()
            .filter(|log| {
                let block = log.block_number.unwrap_or_default();
                block >= from && block <= to && filter.matches(log)
            })
            .cloned()
            .collect())
    }

    async fn install_filter(&self, filter: &LogFilter) -> Result<FilterId, LedgerError> {
        let mut state = self.online()?;
        let id = format!("0x{:x}", state.next_filter);
        state.next_filter += 1;
        let cursor = state.logs.len();
        state.filters.insert(id.clone(), (filter.clone(), cursor));
        Ok(FilterId(id))
    }

    async fn filter_changes(&self, id: &FilterId) -> Result<Vec<RawLog>, LedgerError> {
        let mut state = self.online()?;
        let total = state.logs.len();
        let (filter, cursor) = match state.filters.get(&id.0) {
            Some((filter, cursor)) => (filter.clone(), *cursor),
            None => {
                return Err(LedgerError::Rpc {
                    code: -32000,
                    message: "filter not found".to_string(),
                })
            }
        };
        let changes: Vec<RawLog> = state.logs[cursor..]
            .iter()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect();
        if let Some(entry) = state.filters.get_mut(&id.0) {
            entry.1 = total;
        }
        Ok(changes)
    }

    async fn uninstall_filter(&self, id: &FilterId) -> Result<bool, LedgerError> {
        Ok(self.online()?.filters.remove(&id.0).is_some())
    }
}
