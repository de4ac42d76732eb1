//! Ledger format version per account.

use serde::{Deserialize, Serialize};

/// Accounts start at `Epoch0` and move up one epoch at a time through epoch
/// blocks signed by the network's epoch signer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Epoch {
    #[default]
    Epoch0,
    Epoch1,
}

impl Epoch {
    pub const MAX: Epoch = Epoch::Epoch1;

    /// The epoch an upgrade block would move an account to, if any.
    pub fn successor(self) -> Option<Epoch> {
        match self {
            Epoch::Epoch0 => Some(Epoch::Epoch1),
            Epoch::Epoch1 => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Epoch::Epoch0 => "epoch_0",
            Epoch::Epoch1 => "epoch_1",
        }
    }
}
