//! Nullable store: thread-safe in-memory transactional storage for testing.
//!
//! A read transaction holds a shared lock and a write transaction an
//! exclusive lock over every table, which gives the same
//! multi-reader/single-writer discipline as the real backend. Writes are
//! applied in place and undone on drop unless the transaction commits.

use lattice_store::{Entry, Store, StoreError, Table, Transaction, WriteTransaction};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type TableMap = BTreeMap<Vec<u8>, Vec<u8>>;
type Tables = HashMap<Table, TableMap>;

pub struct NullStore {
    tables: RwLock<Tables>,
}

impl NullStore {
    pub fn new() -> Self {
        let tables = Table::ALL.iter().map(|t| (*t, TableMap::new())).collect();
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Number of entries in a table, outside of any transaction.
    pub fn table_len(&self, table: Table) -> usize {
        self.tables
            .read()
            .map(|t| t.get(&table).map_or(0, |m| m.len()))
            .unwrap_or(0)
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_poisoned() -> StoreError {
    StoreError::Backend("null store lock poisoned".to_string())
}

fn table_get(tables: &Tables, table: Table, key: &[u8]) -> Option<Vec<u8>> {
    tables.get(&table).and_then(|m| m.get(key).cloned())
}

fn table_range(
    tables: &Tables,
    table: Table,
    start: &[u8],
    end: Option<&[u8]>,
    limit: usize,
) -> Vec<Entry> {
    let Some(map) = tables.get(&table) else {
        return Vec::new();
    };
    let upper = match end {
        Some(e) if e <= start => return Vec::new(),
        Some(e) => Bound::Excluded(e),
        None => Bound::Unbounded,
    };
    map.range::<[u8], _>((Bound::Included(start), upper))
        .take(limit)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn table_count(tables: &Tables, table: Table) -> u64 {
    tables.get(&table).map_or(0, |m| m.len() as u64)
}

pub struct NullReadTxn<'a> {
    guard: RwLockReadGuard<'a, Tables>,
}

impl Transaction for NullReadTxn<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(table_get(&self.guard, table, key))
    }

    fn range(
        &self,
        table: Table,
        start: &[u8],
        end: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<Entry>, StoreError> {
        Ok(table_range(&self.guard, table, start, end, limit))
    }

    fn count(&self, table: Table) -> Result<u64, StoreError> {
        Ok(table_count(&self.guard, table))
    }
}

pub struct NullWriteTxn<'a> {
    guard: RwLockWriteGuard<'a, Tables>,
    /// Previous value of every key touched, oldest first.
    undo: Vec<(Table, Vec<u8>, Option<Vec<u8>>)>,
    committed: bool,
}

impl Transaction for NullWriteTxn<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(table_get(&self.guard, table, key))
    }

    fn range(
        &self,
        table: Table,
        start: &[u8],
        end: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<Entry>, StoreError> {
        Ok(table_range(&self.guard, table, start, end, limit))
    }

    fn count(&self, table: Table) -> Result<u64, StoreError> {
        Ok(table_count(&self.guard, table))
    }
}

impl WriteTransaction for NullWriteTxn<'_> {
    fn put(&mut self, table: Table, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let previous = self
            .guard
            .entry(table)
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        self.undo.push((table, key.to_vec(), previous));
        Ok(())
    }

    fn delete(&mut self, table: Table, key: &[u8]) -> Result<(), StoreError> {
        let previous = self.guard.entry(table).or_default().remove(key);
        if previous.is_some() {
            self.undo.push((table, key.to_vec(), previous));
        }
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.committed = true;
        self.undo.clear();
        Ok(())
    }

    fn as_read(&self) -> &dyn Transaction {
        self
    }
}

impl Drop for NullWriteTxn<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        while let Some((table, key, previous)) = self.undo.pop() {
            let map = self.guard.entry(table).or_default();
            match previous {
                Some(value) => {
                    map.insert(key, value);
                }
                None => {
                    map.remove(&key);
                }
            }
        }
    }
}

impl Store for NullStore {
    fn tx_begin_read(&self) -> Result<Box<dyn Transaction + '_>, StoreError> {
        let guard = self.tables.read().map_err(|_| lock_poisoned())?;
        Ok(Box::new(NullReadTxn { guard }))
    }

    fn tx_begin_write(&self) -> Result<Box<dyn WriteTransaction + '_>, StoreError> {
        let guard = self.tables.write().map_err(|_| lock_poisoned())?;
        Ok(Box::new(NullWriteTxn {
            guard,
            undo: Vec::new(),
            committed: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_store::{AccountInfo, AccountStore, AccountStoreMut, PendingInfo, PendingKey, PendingStore, PendingStoreMut};
    use lattice_types::{Account, Amount, BlockHash, Epoch};

    #[test]
    fn committed_writes_are_visible() {
        let store = NullStore::new();
        let account = Account::from_u64(1);
        let info = AccountInfo {
            balance: Amount::raw(10),
            ..Default::default()
        };
        let mut txn = store.tx_begin_write().unwrap();
        txn.account_put(&account, &info).unwrap();
        txn.commit().unwrap();

        let txn = store.tx_begin_read().unwrap();
        assert_eq!(txn.account_get(&account).unwrap(), Some(info));
    }

    #[test]
    fn dropped_write_is_rolled_back() {
        let store = NullStore::new();
        let account = Account::from_u64(1);
        {
            let mut txn = store.tx_begin_write().unwrap();
            txn.account_put(&account, &AccountInfo::default()).unwrap();
            txn.commit().unwrap();
        }
        {
            let mut txn = store.tx_begin_write().unwrap();
            txn.account_del(&account).unwrap();
            txn.account_put(&Account::from_u64(2), &AccountInfo::default())
                .unwrap();
            assert!(!txn.account_exists(&account).unwrap());
        }
        let txn = store.tx_begin_read().unwrap();
        assert!(txn.account_exists(&account).unwrap());
        assert!(!txn.account_exists(&Account::from_u64(2)).unwrap());
    }

    #[test]
    fn pending_prefix_scan_is_per_account() {
        let store = NullStore::new();
        let info = PendingInfo {
            source: Account::from_u64(9),
            amount: Amount::raw(5),
            epoch: Epoch::Epoch0,
            dividend: BlockHash::ZERO,
        };
        let mut txn = store.tx_begin_write().unwrap();
        for (dest, hash) in [(1, 1), (1, 2), (2, 3)] {
            let key = PendingKey::new(Account::from_u64(dest), BlockHash::from_u64(hash));
            txn.pending_put(&key, &info).unwrap();
        }
        txn.commit().unwrap();

        let txn = store.tx_begin_read().unwrap();
        assert_eq!(txn.pending_for_account(&Account::from_u64(1)).unwrap().len(), 2);
        assert!(txn.pending_any(&Account::from_u64(2)).unwrap());
        assert!(!txn.pending_any(&Account::from_u64(3)).unwrap());
        assert_eq!(txn.pending_count().unwrap(), 3);
    }

    #[test]
    fn range_respects_limit_and_end() {
        let store = NullStore::new();
        let mut txn = store.tx_begin_write().unwrap();
        for i in 0u8..10 {
            txn.put(Table::Meta, &[i], &[i]).unwrap();
        }
        let entries = txn.range(Table::Meta, &[2], Some(&[7u8][..]), 3).unwrap();
        assert_eq!(entries.iter().map(|(k, _)| k[0]).collect::<Vec<_>>(), vec![2, 3, 4]);
        let entries = txn.range(Table::Meta, &[5], Some(&[7u8][..]), usize::MAX).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn concurrent_readers() {
        let store = NullStore::new();
        let r1 = store.tx_begin_read().unwrap();
        let r2 = store.tx_begin_read().unwrap();
        assert_eq!(r1.count(Table::Blocks).unwrap(), r2.count(Table::Blocks).unwrap());
    }
}
