//! Legacy-era head hash to account mapping.

use crate::codec::{account_from_key, hash_from_key};
use crate::{StoreError, Table, Transaction, WriteTransaction};
use lattice_types::{Account, BlockHash};

pub trait FrontierStore: Transaction {
    fn frontier_get(&self, hash: &BlockHash) -> Result<Option<Account>, StoreError> {
        self.get(Table::Frontiers, hash.as_bytes())?
            .map(|v| account_from_key(&v))
            .transpose()
    }

    fn frontier_count(&self) -> Result<u64, StoreError> {
        self.count(Table::Frontiers)
    }

    fn frontiers_all(&self) -> Result<Vec<(BlockHash, Account)>, StoreError> {
        self.range(Table::Frontiers, &[], None, usize::MAX)?
            .into_iter()
            .map(|(k, v)| Ok((hash_from_key(&k)?, account_from_key(&v)?)))
            .collect()
    }
}

impl<T: Transaction + ?Sized> FrontierStore for T {}

pub trait FrontierStoreMut: WriteTransaction {
    fn frontier_put(&mut self, hash: &BlockHash, account: &Account) -> Result<(), StoreError> {
        self.put(Table::Frontiers, hash.as_bytes(), account.as_bytes())
    }

    fn frontier_del(&mut self, hash: &BlockHash) -> Result<(), StoreError> {
        self.delete(Table::Frontiers, hash.as_bytes())
    }
}

impl<T: WriteTransaction + ?Sized> FrontierStoreMut for T {}
