//! Decoding of exchange and token logs into [`LedgerEvent`]s.
//!
//! Field layouts, indexed or not, come from the declarations in
//! [`crate::contracts::bindings`]. Only the exchange event names are
//! configurable; a renamed event must keep the declared field list.

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolEvent;
use serde::{Deserialize, Serialize};

use crate::contracts::bindings::{
    LogErrorString, LogTokensMinted, OrderExecuted, OrderSubmitted, Transfer,
};
use crate::ledger::RawLog;
use crate::models::{Order, OrderId};

/// Exchange event signatures. Deployments differ in naming
/// (`OrderSubmitted` vs `LogOrderSubmitted`), so these are configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSignatures {
    pub submitted: String,
    pub executed: String,
}

impl EventSignatures {
    /// Name part of the submission signature, for log lines.
    pub fn submitted_name(&self) -> &str {
        self.submitted.split('(').next().unwrap_or(&self.submitted)
    }
}

impl Default for EventSignatures {
    fn default() -> Self {
        Self {
            submitted: OrderSubmitted::SIGNATURE.to_string(),
            executed: OrderExecuted::SIGNATURE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    OrderSubmitted(Order),
    OrderExecuted { id: OrderId },
    Transfer { from: Address, to: Address, value: U256 },
    TokensMinted { to: Address, amount: U256 },
    /// Error string emitted by the token contract.
    ContractError(String),
}

impl LedgerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::OrderSubmitted(_) => "order_submitted",
            LedgerEvent::OrderExecuted { .. } => "order_executed",
            LedgerEvent::Transfer { .. } => "transfer",
            LedgerEvent::TokensMinted { .. } => "tokens_minted",
            LedgerEvent::ContractError(_) => "contract_error",
        }
    }
}

impl From<OrderSubmitted> for Order {
    fn from(event: OrderSubmitted) -> Self {
        Order {
            id: OrderId(event.id),
            maker: event.maker,
            bid_token: event.bidToken,
            bid_amount: event.bidAmount,
            ask_token: event.askToken,
            ask_amount: event.askAmount,
        }
    }
}

/// Maps raw logs of one exchange and one token to [`LedgerEvent`]s.
#[derive(Debug, Clone)]
pub struct EventDecoder {
    exchange: Address,
    token: Address,
    submitted: B256,
    executed: B256,
}

impl EventDecoder {
    pub fn new(exchange: Address, token: Address, signatures: &EventSignatures) -> Self {
        Self {
            exchange,
            token,
            submitted: keccak256(signatures.submitted.as_bytes()),
            executed: keccak256(signatures.executed.as_bytes()),
        }
    }

    pub fn submitted_topic(&self) -> B256 {
        self.submitted
    }

    pub fn exchange(&self) -> Address {
        self.exchange
    }

    pub fn addresses(&self) -> Vec<Address> {
        vec![self.exchange, self.token]
    }

    pub fn topics(&self) -> Vec<B256> {
        vec![
            self.submitted,
            self.executed,
            Transfer::SIGNATURE_HASH,
            LogTokensMinted::SIGNATURE_HASH,
            LogErrorString::SIGNATURE_HASH,
        ]
    }

    /// `Ok(None)` for logs this decoder does not track.
    pub fn decode(&self, log: &RawLog) -> Result<Option<LedgerEvent>, alloy_sol_types::Error> {
        let topic0 = match log.topics.first() {
            Some(t) => *t,
            None => return Ok(None),
        };
        if log.address == self.exchange {
            if topic0 == self.submitted {
                return decode_submitted(log).map(|o| Some(LedgerEvent::OrderSubmitted(o)));
            }
            if topic0 == self.executed {
                let event: OrderExecuted = decode_renamed(log)?;
                return Ok(Some(LedgerEvent::OrderExecuted {
                    id: OrderId(event.id),
                }));
            }
        }
        if log.address == self.token {
            if topic0 == Transfer::SIGNATURE_HASH {
                let event: Transfer = decode_renamed(log)?;
                return Ok(Some(LedgerEvent::Transfer {
                    from: event.from,
                    to: event.to,
                    value: event.value,
                }));
            }
            if topic0 == LogTokensMinted::SIGNATURE_HASH {
                let event: LogTokensMinted = decode_renamed(log)?;
                return Ok(Some(LedgerEvent::TokensMinted {
                    to: event.to,
                    amount: event.amount,
                }));
            }
            if topic0 == LogErrorString::SIGNATURE_HASH {
                let event: LogErrorString = decode_renamed(log)?;
                return Ok(Some(LedgerEvent::ContractError(event.message)));
            }
        }
        Ok(None)
    }
}

/// Decode an `OrderSubmitted` log into the order it announces. Topic0 is
/// not checked, so a renamed submission event decodes too.
pub fn decode_submitted(log: &RawLog) -> Result<Order, alloy_sol_types::Error> {
    decode_renamed::<OrderSubmitted>(log).map(Order::from)
}

/// Decode `log` as `E` whatever its topic0, keeping the indexed topics.
fn decode_renamed<E: SolEvent>(log: &RawLog) -> Result<E, alloy_sol_types::Error> {
    let topics = std::iter::once(E::SIGNATURE_HASH).chain(log.topics.iter().skip(1).copied());
    E::decode_raw_log(topics, &log.data, true)
}
