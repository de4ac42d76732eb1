//! Pending (sent but not yet received) entries.

use crate::codec::{decode, encode, pair_key, split_pair_key};
use crate::{prefix_end, StoreError, Table, Transaction, WriteTransaction};
use lattice_types::{Account, Amount, BlockHash, Epoch};
use serde::{Deserialize, Serialize};

/// Keyed by destination first so that one account's entries are contiguous.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PendingKey {
    pub destination: Account,
    pub hash: BlockHash,
}

impl PendingKey {
    pub fn new(destination: Account, hash: BlockHash) -> Self {
        Self { destination, hash }
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        pair_key(self.destination.as_bytes(), self.hash.as_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        let (destination, hash) = split_pair_key(bytes)?;
        Ok(Self {
            destination: Account::new(destination),
            hash: BlockHash::new(hash),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInfo {
    /// Account that sent the funds.
    pub source: Account,
    pub amount: Amount,
    pub epoch: Epoch,
    /// The sender's dividend pointer when the send was made.
    pub dividend: BlockHash,
}

pub trait PendingStore: Transaction {
    fn pending_get(&self, key: &PendingKey) -> Result<Option<PendingInfo>, StoreError> {
        self.get(Table::Pending, &key.to_bytes())?
            .map(|v| decode(&v))
            .transpose()
    }

    fn pending_exists(&self, key: &PendingKey) -> Result<bool, StoreError> {
        self.exists(Table::Pending, &key.to_bytes())
    }

    /// Every pending entry addressed to `destination`.
    fn pending_for_account(
        &self,
        destination: &Account,
    ) -> Result<Vec<(PendingKey, PendingInfo)>, StoreError> {
        let prefix = destination.as_bytes();
        let end = prefix_end(prefix);
        self.range(Table::Pending, prefix, end.as_deref(), usize::MAX)?
            .into_iter()
            .map(|(k, v)| Ok((PendingKey::from_bytes(&k)?, decode(&v)?)))
            .collect()
    }

    fn pending_any(&self, destination: &Account) -> Result<bool, StoreError> {
        let prefix = destination.as_bytes();
        let end = prefix_end(prefix);
        Ok(!self
            .range(Table::Pending, prefix, end.as_deref(), 1)?
            .is_empty())
    }

    fn pending_count(&self) -> Result<u64, StoreError> {
        self.count(Table::Pending)
    }

    fn pending_all(&self) -> Result<Vec<(PendingKey, PendingInfo)>, StoreError> {
        self.range(Table::Pending, &[], None, usize::MAX)?
            .into_iter()
            .map(|(k, v)| Ok((PendingKey::from_bytes(&k)?, decode(&v)?)))
            .collect()
    }
}

impl<T: Transaction + ?Sized> PendingStore for T {}

pub trait PendingStoreMut: WriteTransaction {
    fn pending_put(&mut self, key: &PendingKey, info: &PendingInfo) -> Result<(), StoreError> {
        let value = encode(info)?;
        self.put(Table::Pending, &key.to_bytes(), &value)
    }

    fn pending_del(&mut self, key: &PendingKey) -> Result<(), StoreError> {
        self.delete(Table::Pending, &key.to_bytes())
    }
}

impl<T: WriteTransaction + ?Sized> PendingStoreMut for T {}
