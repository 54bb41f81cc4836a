use alloy_primitives::Address;
use tracing::info;

use crate::error::{Result, SyncError};
use crate::ledger::Ledger;

/// Accounts offered by the node and the one commands act for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    accounts: Vec<Address>,
    active: usize,
}

impl Session {
    pub fn new(accounts: Vec<Address>, active: usize) -> Result<Self> {
        if accounts.is_empty() {
            return Err(SyncError::NoAccounts);
        }
        if active >= accounts.len() {
            return Err(SyncError::UnknownAccount {
                index: active,
                available: accounts.len(),
            });
        }
        Ok(Self { accounts, active })
    }

    /// Enumerate the node's accounts and start with `active` selected.
    pub async fn connect<L: Ledger + ?Sized>(ledger: &L, active: usize) -> Result<Self> {
        let accounts = ledger.accounts().await?;
        let session = Self::new(accounts, active)?;
        info!(account = %session.active(), available = session.accounts.len(), "session opened");
        Ok(session)
    }

    pub fn active(&self) -> Address {
        self.accounts[self.active]
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    pub fn account(&self, index: usize) -> Result<Address> {
        self.accounts
            .get(index)
            .copied()
            .ok_or(SyncError::UnknownAccount {
                index,
                available: self.accounts.len(),
            })
    }

    pub fn select(&mut self, index: usize) -> Result<Address> {
        let address = self.account(index)?;
        self.active = index;
        info!(account = %address, "active account changed");
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> Vec<Address> {
        vec![Address::repeat_byte(1), Address::repeat_byte(2)]
    }

    #[test]
    fn test_new_rejects_empty_and_out_of_range() {
        assert!(matches!(Session::new(vec![], 0), Err(SyncError::NoAccounts)));
        assert!(matches!(
            Session::new(accounts(), 2),
            Err(SyncError::UnknownAccount { index: 2, available: 2 })
        ));
    }

    #[test]
    fn test_select_switches_active_account() {
        let mut session = Session::new(accounts(), 0).unwrap();
        assert_eq!(session.active(), Address::repeat_byte(1));
        assert_eq!(session.select(1).unwrap(), Address::repeat_byte(2));
        assert_eq!(session.active(), Address::repeat_byte(2));
        assert_eq!(session.active_index(), 1);
        assert!(session.select(5).is_err());
        assert_eq!(session.active_index(), 1);
    }
}
