//! Keeps an [`OrderBookView`] consistent with the exchange.
//!
//! The view itself is owned by the caller and handed in by `&mut`; this type
//! only knows how to fill it from history ([`OrderBookSync::bootstrap`]),
//! how to apply live events to it ([`OrderBookSync::handle_event`]) and how to
//! place and take orders on the ledger.

use alloy_primitives::{Address, B256};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::balances::BalanceRefresher;
use crate::book::{InsertOutcome, OrderBookView};
use crate::contracts::{Exchange, TokenContract};
use crate::error::{Result, SyncError};
use crate::events::{self, EventDecoder, EventSignatures, LedgerEvent};
use crate::ledger::{Ledger, LogFilter, TxReceipt};
use crate::models::{Order, OrderId, OrderRequest};
use crate::session::Session;
use crate::subscription::{InstalledFilter, Subscription};

pub const DEFAULT_GAS: u64 = 6_000_000;
pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub token: Address,
    pub exchange: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Gas limit attached to every transaction.
    pub gas: u64,
    /// Upper bound on concurrent point queries during bootstrap.
    pub concurrency: usize,
    pub poll_interval: Duration,
    pub events: EventSignatures,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            gas: DEFAULT_GAS,
            concurrency: DEFAULT_CONCURRENCY,
            poll_interval: Duration::from_millis(1000),
            events: EventSignatures::default(),
        }
    }
}

/// Tally of one historical scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Submission logs found between genesis and head.
    pub scanned: usize,
    pub inserted: usize,
    /// Orders the ledger reports as no longer open.
    pub closed: usize,
    pub duplicates: usize,
    /// Logs that failed to decode or whose point query failed.
    pub failed: usize,
}

/// What applying one event did to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Inserted(OrderId),
    Duplicate(OrderId),
    /// Submission for an id that was already removed.
    AlreadyRemoved(OrderId),
    Removed(OrderId),
    /// Execution of an id the view never held.
    UnknownRemoval(OrderId),
    BalancesRefreshed,
    ContractError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub id: OrderId,
    pub order: Order,
    pub approve_tx: B256,
    pub submit_tx: B256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    Executed(TxReceipt),
    /// The ledger reports nothing left to take.
    Skipped { id: OrderId },
}

pub struct OrderBookSync<L> {
    ledger: Arc<L>,
    exchange: Exchange<L>,
    token: TokenContract<L>,
    decoder: EventDecoder,
    balances: Arc<dyn BalanceRefresher>,
    options: SyncOptions,
}

impl<L: Ledger + 'static> OrderBookSync<L> {
    pub fn new(
        ledger: Arc<L>,
        addresses: ContractAddresses,
        balances: Arc<dyn BalanceRefresher>,
        options: SyncOptions,
    ) -> Self {
        let decoder = EventDecoder::new(addresses.exchange, addresses.token, &options.events);
        Self {
            exchange: Exchange::new(ledger.clone(), addresses.exchange, options.gas),
            token: TokenContract::new(ledger.clone(), addresses.token, options.gas),
            ledger,
            decoder,
            balances,
            options,
        }
    }

    pub fn exchange(&self) -> &Exchange<L> {
        &self.exchange
    }

    pub fn token(&self) -> &TokenContract<L> {
        &self.token
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Load every historical submission that is still open into `view`.
    ///
    /// Point queries run concurrently and are applied as they complete, so
    /// the resulting display order is not deterministic.
    pub async fn bootstrap(&self, view: &mut OrderBookView) -> Result<BootstrapReport> {
        let head = self.ledger.block_number().await?;
        let filter = LogFilter::history(
            vec![self.exchange.address()],
            vec![self.decoder.submitted_topic()],
            head,
        );
        let logs = self.ledger.logs(&filter).await?;
        let mut report = BootstrapReport {
            scanned: logs.len(),
            ..Default::default()
        };
        debug!(head, logs = logs.len(), "historical submissions fetched");

        let mut candidates = Vec::with_capacity(logs.len());
        for log in &logs {
            match events::decode_submitted(log) {
                Ok(order) => candidates.push(order),
                Err(e) => {
                    warn!(block = ?log.block_number, error = %e, "undecodable submission log");
                    report.failed += 1;
                }
            }
        }

        let exchange = &self.exchange;
        let mut lookups = stream::iter(candidates)
            .map(|order| async move {
                let ask = exchange.remaining_ask(order.id).await;
                (order, ask)
            })
            .buffer_unordered(self.options.concurrency.max(1));

        while let Some((order, ask)) = lookups.next().await {
            let id = order.id;
            match ask {
                Ok(ask) if ask.is_zero() => report.closed += 1,
                Ok(_) => match view.insert(order) {
                    InsertOutcome::Inserted => report.inserted += 1,
                    InsertOutcome::Duplicate => report.duplicates += 1,
                    InsertOutcome::Removed => report.closed += 1,
                },
                Err(e) => {
                    warn!(%id, error = %e, "order lookup failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            scanned = report.scanned,
            open = report.inserted,
            closed = report.closed,
            failed = report.failed,
            "order book bootstrapped"
        );
        Ok(report)
    }

    /// Start tailing exchange and token events from the current head.
    pub async fn subscribe(&self) -> Result<Subscription> {
        let filter = LogFilter::latest(self.decoder.addresses(), self.decoder.topics());
        let head = self.ledger.block_number().await?;
        let id = self.ledger.install_filter(&filter).await?;
        info!(
            filter = %id.0,
            exchange = %self.exchange.address(),
            submitted = self.options.events.submitted_name(),
            "subscribed to order events"
        );
        Ok(Subscription::spawn(
            self.ledger.clone(),
            InstalledFilter { id, filter, head },
            self.decoder.clone(),
            self.options.poll_interval,
        ))
    }

    /// Apply one delivered event to `view`.
    pub async fn handle_event(
        &self,
        session: &Session,
        view: &mut OrderBookView,
        event: LedgerEvent,
    ) -> EventOutcome {
        let outcome = match event {
            LedgerEvent::OrderSubmitted(order) => {
                let id = order.id;
                match view.insert(order) {
                    InsertOutcome::Inserted => {
                        debug!(%id, "order added");
                        EventOutcome::Inserted(id)
                    }
                    InsertOutcome::Duplicate => {
                        warn!(%id, "duplicate submission ignored");
                        EventOutcome::Duplicate(id)
                    }
                    InsertOutcome::Removed => {
                        debug!(%id, "submission for removed order ignored");
                        EventOutcome::AlreadyRemoved(id)
                    }
                }
            }
            LedgerEvent::OrderExecuted { id } => match view.remove(&id) {
                Some(_) => {
                    debug!(%id, tombstones = view.tombstones(), "order removed");
                    EventOutcome::Removed(id)
                }
                None => {
                    debug!(%id, "execution of unknown order");
                    EventOutcome::UnknownRemoval(id)
                }
            },
            LedgerEvent::Transfer { .. } | LedgerEvent::TokensMinted { .. } => {
                EventOutcome::BalancesRefreshed
            }
            LedgerEvent::ContractError(message) => {
                error!(%message, "token contract reported an error");
                return EventOutcome::ContractError(message);
            }
        };
        self.balances.refresh(session.active()).await;
        outcome
    }

    /// Approve the exchange for `bid_amount`, then place the order.
    ///
    /// The two transactions are not atomic. When the second one fails the
    /// allowance stays granted and is reported via
    /// [`SyncError::LeakedAllowance`].
    pub async fn submit_order(
        &self,
        session: &Session,
        request: OrderRequest,
    ) -> Result<SubmitReceipt> {
        let from = session.active();
        let bid_token = TokenContract::new(self.ledger.clone(), request.bid_token, self.options.gas);
        let approval = bid_token
            .approve(from, self.exchange.address(), request.bid_amount)
            .await?;
        let approve_tx = approval.transaction_hash;
        debug!(tx = %approve_tx, amount = %request.bid_amount, "exchange allowance granted");

        let receipt = self
            .exchange
            .submit_order(from, &request)
            .await
            .map_err(|source| {
                error!(approve_tx = %approve_tx, error = %source, "order submission failed after approval");
                SyncError::LeakedAllowance { approve_tx, source }
            })?;

        let order = self
            .submitted_in(&receipt)
            .ok_or(SyncError::MissingOrderEvent {
                tx_hash: receipt.transaction_hash,
            })?;
        info!(id = %order.id, maker = %from, tx = %receipt.transaction_hash, "order submitted");
        Ok(SubmitReceipt {
            id: order.id,
            order,
            approve_tx,
            submit_tx: receipt.transaction_hash,
        })
    }

    /// Take order `id`, paying whatever the ledger currently asks for it.
    pub async fn execute_order(&self, session: &Session, id: OrderId) -> Result<ExecuteOutcome> {
        let ask = self.exchange.remaining_ask(id).await?;
        if ask.is_zero() {
            info!(%id, "order is no longer open, skipping execution");
            return Ok(ExecuteOutcome::Skipped { id });
        }
        let receipt = self.exchange.execute_order(session.active(), id, ask).await?;
        info!(%id, paid = %ask, tx = %receipt.transaction_hash, "order executed");
        Ok(ExecuteOutcome::Executed(receipt))
    }

    fn submitted_in(&self, receipt: &TxReceipt) -> Option<Order> {
        let topic = self.decoder.submitted_topic();
        receipt
            .logs
            .iter()
            .filter(|log| log.address == self.exchange.address() && log.topics.first() == Some(&topic))
            .find_map(|log| events::decode_submitted(log).ok())
    }
}
