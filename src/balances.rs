//! Balance-refresh collaborator.
//!
//! The sync component only asks for a refresh of an address; fetching and
//! publishing balances is owned here.

use alloy_primitives::Address;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::contracts::TokenContract;
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::models::BalanceSnapshot;

#[async_trait]
pub trait BalanceRefresher: Send + Sync {
    async fn refresh(&self, account: Address);
}

/// Fetches native and token balances and publishes the latest snapshot.
pub struct AccountBalances<L> {
    ledger: Arc<L>,
    token: TokenContract<L>,
    latest: watch::Sender<Option<BalanceSnapshot>>,
}

impl<L: Ledger> AccountBalances<L> {
    pub fn new(ledger: Arc<L>, token: TokenContract<L>) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            ledger,
            token,
            latest,
        }
    }

    pub async fn load(&self, account: Address) -> Result<BalanceSnapshot, LedgerError> {
        let (native, token) =
            tokio::try_join!(self.ledger.balance(account), self.token.balance_of(account))?;
        Ok(BalanceSnapshot {
            account,
            native,
            token,
        })
    }

    pub fn latest(&self) -> Option<BalanceSnapshot> {
        self.latest.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Option<BalanceSnapshot>> {
        self.latest.subscribe()
    }
}

#[async_trait]
impl<L: Ledger + 'static> BalanceRefresher for AccountBalances<L> {
    async fn refresh(&self, account: Address) {
        match self.load(account).await {
            Ok(snapshot) => {
                debug!(%account, native = %snapshot.native, token = %snapshot.token, "balances refreshed");
                self.latest.send_replace(Some(snapshot));
            }
            Err(e) => warn!(%account, error = %e, "balance refresh failed, keeping previous snapshot"),
        }
    }
}
