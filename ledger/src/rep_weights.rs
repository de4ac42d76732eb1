//! In-memory mirror of the representation table.
//!
//! The ledger updates the mirror together with the table on every apply and
//! rollback, so weight lookups from the election engine never need a store
//! transaction. Loaded once from the table when the ledger opens.

use lattice_types::{Account, Amount};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct RepWeights {
    inner: RwLock<Weights>,
}

#[derive(Default)]
struct Weights {
    by_rep: HashMap<Account, Amount>,
    total: Amount,
}

impl RepWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, rep: &Account, amount: Amount) {
        if amount.is_zero() {
            return;
        }
        let mut w = self.write();
        let entry = w.by_rep.entry(*rep).or_default();
        *entry = entry.saturating_add(amount);
        w.total = w.total.saturating_add(amount);
    }

    /// Subtract weight, clamped at zero. Entries reaching zero are removed.
    pub fn sub(&self, rep: &Account, amount: Amount) {
        let mut w = self.write();
        let Some(entry) = w.by_rep.get_mut(rep) else {
            return;
        };
        let removed = if amount > *entry { *entry } else { amount };
        *entry = entry.saturating_sub(removed);
        if entry.is_zero() {
            w.by_rep.remove(rep);
        }
        w.total = w.total.saturating_sub(removed);
    }

    pub fn weight(&self, rep: &Account) -> Amount {
        self.read().by_rep.get(rep).copied().unwrap_or_default()
    }

    pub fn total(&self) -> Amount {
        self.read().total
    }

    pub fn len(&self) -> usize {
        self.read().by_rep.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> HashMap<Account, Amount> {
        self.read().by_rep.clone()
    }

    /// Replace the contents with `(representative, weight)` pairs.
    pub fn rebuild(&self, weights: impl IntoIterator<Item = (Account, Amount)>) {
        let mut w = self.write();
        w.by_rep.clear();
        w.total = Amount::ZERO;
        for (rep, amount) in weights {
            if amount.is_zero() {
                continue;
            }
            let entry = w.by_rep.entry(rep).or_default();
            *entry = entry.saturating_add(amount);
            w.total = w.total.saturating_add(amount);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Weights> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Weights> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
