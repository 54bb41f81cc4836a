//! # orderbook-sync
//!
//! Client for an ERC20 token exchange with an on-ledger order book.
//! Keeps a local view of the open orders in sync with the exchange contract
//! over an Ethereum-style JSON-RPC node, and places and takes orders.
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | `book` | Local view of open orders, with tombstones for removed ids |
//! | `sync` | Bootstrap from history, apply live events, submit and execute orders |
//! | `subscription` | Polling log filter delivering decoded events |
//! | `ledger` | `Ledger` capability trait and its JSON-RPC implementation |
//! | `contracts` | Typed bindings for the exchange and the token |
//! | `events` | Log decoding into `LedgerEvent`s |
//! | `balances` | Native and token balance refresh for the active account |
//! | `session` | Node accounts and the active one |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use orderbook_sync::{
//!     AccountBalances, ContractAddresses, OrderBookSync, OrderBookView, RpcLedger, RpcOptions,
//!     Session, SyncOptions, TokenContract,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ledger = Arc::new(RpcLedger::new("http://127.0.0.1:8545", RpcOptions::default())?);
//!     let addresses = ContractAddresses {
//!         token: "0x0000000000000000000000000000000000000070".parse()?,
//!         exchange: "0x00000000000000000000000000000000000000ee".parse()?,
//!     };
//!     let options = SyncOptions::default();
//!     let token = TokenContract::new(ledger.clone(), addresses.token, options.gas);
//!     let balances = Arc::new(AccountBalances::new(ledger.clone(), token));
//!     let session = Session::connect(ledger.as_ref(), 0).await?;
//!     let sync = OrderBookSync::new(ledger, addresses, balances, options);
//!
//!     let mut view = OrderBookView::new();
//!     let mut events = sync.subscribe().await?;
//!     sync.bootstrap(&mut view).await?;
//!     while let Some(event) = events.next().await {
//!         sync.handle_event(&session, &mut view, event).await;
//!         println!("{} open orders", view.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Open orders, as a table or JSON
//! cargo run --release -- book
//! cargo run --release -- --json book --out book.json
//!
//! # Follow the book live
//! cargo run --release -- watch
//!
//! # Sell 10 tokens for 1 ETH from account 1, then take an order
//! cargo run --release -- --account 1 submit 10 1
//! cargo run --release -- execute 0x<order id>
//! ```

pub mod artifacts;
pub mod balances;
pub mod book;
pub mod config;
pub mod contracts;
pub mod error;
pub mod events;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod render;
pub mod session;
pub mod subscription;
pub mod sync;
pub mod utils;

pub use artifacts::{load_from_file, resolve_address, save_to_file};
pub use balances::{AccountBalances, BalanceRefresher};
pub use book::{InsertOutcome, OrderBookView};
pub use config::Config;
pub use contracts::{Exchange, TokenContract};
pub use error::{LedgerError, SyncError};
pub use events::{EventSignatures, LedgerEvent};
pub use ledger::{Ledger, RpcLedger, RpcOptions};
pub use models::{BalanceSnapshot, Order, OrderId, OrderRequest, OrderStatus, TokenInfo};
pub use session::Session;
pub use subscription::Subscription;
pub use sync::{
    BootstrapReport, ContractAddresses, EventOutcome, ExecuteOutcome, OrderBookSync,
    SubmitReceipt, SyncOptions,
};
