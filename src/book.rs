//! Local projection of the exchange's open orders.
//!
//! The view is keyed by [`OrderId`] and kept newest first. Every id moves
//! through `unknown → open → removed` at most once: removed ids are kept as
//! tombstones so that a late or replayed submission can never bring an
//! executed order back, and a removal that overtakes its own submission still
//! wins.

use std::collections::{HashSet, VecDeque};

use crate::models::{Order, OrderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The id is already in the view; the second write was ignored.
    Duplicate,
    /// The id was removed earlier and stays removed.
    Removed,
}

/// Open orders plus the ids that may never open again.
///
/// The tombstone set gains one id per removal and is never trimmed, so a
/// long-running view grows with the number of executions it has seen. That
/// is the cost of refusing to reopen an order however late its submission
/// is delivered.
#[derive(Debug, Default, Clone)]
pub struct OrderBookView {
    orders: VecDeque<Order>,
    open: HashSet<OrderId>,
    removed: HashSet<OrderId>,
}

impl OrderBookView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert-if-absent at the front of the view.
    pub fn insert(&mut self, order: Order) -> InsertOutcome {
        if self.removed.contains(&order.id) {
            return InsertOutcome::Removed;
        }
        if !self.open.insert(order.id) {
            return InsertOutcome::Duplicate;
        }
        self.orders.push_front(order);
        InsertOutcome::Inserted
    }

    /// Remove-if-present. The id is tombstoned either way, so a submission
    /// for it that is still in flight will not be inserted afterwards.
    pub fn remove(&mut self, id: &OrderId) -> Option<Order> {
        self.removed.insert(*id);
        if !self.open.remove(id) {
            return None;
        }
        let index = self.orders.iter().position(|o| o.id == *id)?;
        self.orders.remove(index)
    }

    pub fn contains(&self, id: &OrderId) -> bool {
        self.open.contains(id)
    }

    pub fn is_removed(&self, id: &OrderId) -> bool {
        self.removed.contains(id)
    }

    /// Number of tombstoned ids.
    pub fn tombstones(&self) -> usize {
        self.removed.len()
    }

    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        if !self.open.contains(id) {
            return None;
        }
        self.orders.iter().find(|o| o.id == *id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Orders newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    /// Owned copy for the presentation layer.
    pub fn snapshot(&self) -> Vec<Order> {
        self.orders.iter().cloned().collect()
    }

    pub fn ids(&self) -> HashSet<OrderId> {
        self.open.clone()
    }
}
