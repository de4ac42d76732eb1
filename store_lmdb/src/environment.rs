//! LMDB environment setup.

use std::collections::HashMap;
use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use lattice_store::{
    MetaStore, MetaStoreMut, Store, StoreError, Table, Transaction, WriteTransaction,
    STORE_VERSION,
};

use crate::transaction::{LmdbReadTxn, LmdbWriteTxn};
use crate::LmdbError;

/// Default map size: 64 GiB of address space, grown lazily by the OS.
pub const DEFAULT_MAP_SIZE: usize = 64 * 1024 * 1024 * 1024;

/// Wraps the LMDB environment and one database handle per table.
pub struct LmdbStore {
    env: Env,
    databases: HashMap<Table, Database<Bytes, Bytes>>,
}

impl LmdbStore {
    /// Open or create an LMDB environment in the directory `path`.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path).map_err(LmdbError::from)?;
        // SAFETY: the environment is opened once per directory by this process
        // and never concurrently by another `LmdbStore`.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(Table::ALL.len() as u32)
                .open(path)
        }
        .map_err(LmdbError::from)?;

        let mut wtxn = env.write_txn().map_err(LmdbError::from)?;
        let mut databases = HashMap::new();
        for table in Table::ALL {
            let db = env
                .create_database::<Bytes, Bytes>(&mut wtxn, Some(table.name()))
                .map_err(LmdbError::from)?;
            databases.insert(table, db);
        }
        wtxn.commit().map_err(LmdbError::from)?;

        let store = Self { env, databases };
        store.check_version()?;
        tracing::info!(path = %path.display(), "opened LMDB store");
        Ok(store)
    }

    pub(crate) fn db(&self, table: Table) -> Result<&Database<Bytes, Bytes>, LmdbError> {
        self.databases
            .get(&table)
            .ok_or(LmdbError::MissingDatabase(table.name()))
    }

    fn check_version(&self) -> Result<(), StoreError> {
        let mut txn = self.tx_begin_write()?;
        match txn.version_get()? {
            None => {
                txn.version_put(STORE_VERSION)?;
                txn.commit()
            }
            Some(found) if found == STORE_VERSION => Ok(()),
            Some(found) => Err(StoreError::Version {
                found,
                expected: STORE_VERSION,
            }),
        }
    }
}

impl Store for LmdbStore {
    fn tx_begin_read(&self) -> Result<Box<dyn Transaction + '_>, StoreError> {
        let txn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(Box::new(LmdbReadTxn::new(self, txn)))
    }

    fn tx_begin_write(&self) -> Result<Box<dyn WriteTransaction + '_>, StoreError> {
        let txn = self.env.write_txn().map_err(LmdbError::from)?;
        Ok(Box::new(LmdbWriteTxn::new(self, txn)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_store::{AccountInfo, AccountStore, AccountStoreMut};
    use lattice_types::{Account, Amount};

    fn open_temp() -> (tempfile::TempDir, LmdbStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStore::open(dir.path(), 16 * 1024 * 1024).unwrap();
        (dir, store)
    }

    #[test]
    fn fresh_store_records_version() {
        let (_dir, store) = open_temp();
        let txn = store.tx_begin_read().unwrap();
        assert_eq!(txn.version_get().unwrap(), Some(STORE_VERSION));
    }

    #[test]
    fn commit_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let account = Account::from_u64(3);
        {
            let store = LmdbStore::open(dir.path(), 16 * 1024 * 1024).unwrap();
            let mut txn = store.tx_begin_write().unwrap();
            let info = AccountInfo {
                balance: Amount::raw(77),
                ..Default::default()
            };
            txn.account_put(&account, &info).unwrap();
            txn.commit().unwrap();
        }
        let store = LmdbStore::open(dir.path(), 16 * 1024 * 1024).unwrap();
        let txn = store.tx_begin_read().unwrap();
        assert_eq!(
            txn.account_get(&account).unwrap().map(|i| i.balance),
            Some(Amount::raw(77))
        );
    }

    #[test]
    fn abort_discards_writes() {
        let (_dir, store) = open_temp();
        {
            let mut txn = store.tx_begin_write().unwrap();
            txn.account_put(&Account::from_u64(1), &AccountInfo::default())
                .unwrap();
        }
        let txn = store.tx_begin_read().unwrap();
        assert_eq!(txn.account_count().unwrap(), 0);
    }

    #[test]
    fn range_scan_is_ordered_and_bounded() {
        let (_dir, store) = open_temp();
        let mut txn = store.tx_begin_write().unwrap();
        for i in [5u8, 1, 3, 9, 7] {
            txn.put(Table::Meta, &[0xAA, i], &[i]).unwrap();
        }
        let entries = txn
            .range(Table::Meta, &[0xAA, 2], Some(&[0xAA, 8][..]), usize::MAX)
            .unwrap();
        let keys: Vec<u8> = entries.iter().map(|(k, _)| k[1]).collect();
        assert_eq!(keys, vec![3, 5, 7]);
        let limited = txn.range(Table::Meta, &[0xAA], None, 2).unwrap();
        assert_eq!(limited.len(), 2);
    }
}
