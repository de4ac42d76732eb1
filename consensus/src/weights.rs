//! Where elections and caches read representative weight from.

use std::collections::HashMap;

use lattice_ledger::{Ledger, RepWeights};
use lattice_types::{Account, Amount};

/// Voting weight lookup. Implementations must not take store locks, since
/// callers hold consensus locks while tallying.
pub trait WeightSource {
    fn weight(&self, representative: &Account) -> Amount;
}

impl WeightSource for Ledger {
    fn weight(&self, representative: &Account) -> Amount {
        Ledger::weight(self, representative)
    }
}

impl WeightSource for RepWeights {
    fn weight(&self, representative: &Account) -> Amount {
        RepWeights::weight(self, representative)
    }
}

impl WeightSource for HashMap<Account, Amount> {
    fn weight(&self, representative: &Account) -> Amount {
        self.get(representative).copied().unwrap_or_default()
    }
}
