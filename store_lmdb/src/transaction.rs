//! Read and write transactions over the LMDB environment.

use std::ops::Bound;

use heed::{RoTxn, RwTxn};
use lattice_store::{Entry, StoreError, Table, Transaction, WriteTransaction};

use crate::environment::LmdbStore;
use crate::LmdbError;

fn get(store: &LmdbStore, txn: &RoTxn, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
    let value = store
        .db(table)?
        .get(txn, key)
        .map_err(LmdbError::from)?;
    Ok(value.map(|v| v.to_vec()))
}

fn range(
    store: &LmdbStore,
    txn: &RoTxn,
    table: Table,
    start: &[u8],
    end: Option<&[u8]>,
    limit: usize,
) -> Result<Vec<Entry>, StoreError> {
    let upper = match end {
        Some(e) if e <= start => return Ok(Vec::new()),
        Some(e) => Bound::Excluded(e),
        None => Bound::Unbounded,
    };
    let bounds = (Bound::Included(start), upper);
    let iter = store
        .db(table)?
        .range(txn, &bounds)
        .map_err(LmdbError::from)?;
    let mut result = Vec::new();
    for item in iter.take(limit) {
        let (k, v) = item.map_err(LmdbError::from)?;
        result.push((k.to_vec(), v.to_vec()));
    }
    Ok(result)
}

fn count(store: &LmdbStore, txn: &RoTxn, table: Table) -> Result<u64, StoreError> {
    Ok(store.db(table)?.len(txn).map_err(LmdbError::from)?)
}

pub struct LmdbReadTxn<'a> {
    store: &'a LmdbStore,
    txn: RoTxn<'a>,
}

impl<'a> LmdbReadTxn<'a> {
    pub(crate) fn new(store: &'a LmdbStore, txn: RoTxn<'a>) -> Self {
        Self { store, txn }
    }
}

impl Transaction for LmdbReadTxn<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        get(self.store, &self.txn, table, key)
    }

    fn range(
        &self,
        table: Table,
        start: &[u8],
        end: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<Entry>, StoreError> {
        range(self.store, &self.txn, table, start, end, limit)
    }

    fn count(&self, table: Table) -> Result<u64, StoreError> {
        count(self.store, &self.txn, table)
    }
}

/// Aborted on drop unless committed.
pub struct LmdbWriteTxn<'a> {
    store: &'a LmdbStore,
    txn: RwTxn<'a>,
}

impl<'a> LmdbWriteTxn<'a> {
    pub(crate) fn new(store: &'a LmdbStore, txn: RwTxn<'a>) -> Self {
        Self { store, txn }
    }
}

impl Transaction for LmdbWriteTxn<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        get(self.store, &self.txn, table, key)
    }

    fn range(
        &self,
        table: Table,
        start: &[u8],
        end: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<Entry>, StoreError> {
        range(self.store, &self.txn, table, start, end, limit)
    }

    fn count(&self, table: Table) -> Result<u64, StoreError> {
        count(self.store, &self.txn, table)
    }
}

impl WriteTransaction for LmdbWriteTxn<'_> {
    fn put(&mut self, table: Table, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.store
            .db(table)?
            .put(&mut self.txn, key, value)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete(&mut self, table: Table, key: &[u8]) -> Result<(), StoreError> {
        self.store
            .db(table)?
            .delete(&mut self.txn, key)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn as_read(&self) -> &dyn Transaction {
        self
    }
}
