//! Abstract transactional store for the lattice node.
//!
//! A store is a set of named tables of byte keys and byte values accessed
//! through read or read-write transactions. Only one write transaction may be
//! open at a time; read transactions may run concurrently with each other.
//!
//! Backends (LMDB, in-memory for testing) implement [`Store`], [`Transaction`]
//! and [`WriteTransaction`]. The typed per-table traits in this crate
//! (`AccountStore`, `PendingStore`, ...) are blanket-implemented on top of
//! those, so the rest of the codebase only ever sees typed accessors.

pub mod account;
pub mod block;
pub mod checksum;
pub mod codec;
pub mod dividend;
pub mod error;
pub mod frontier;
pub mod meta;
pub mod pending;
pub mod representation;
pub mod table;
pub mod unchecked;
pub mod vote;

pub use account::{AccountInfo, AccountStore, AccountStoreMut};
pub use block::{BlockStore, BlockStoreMut};
pub use checksum::{ChecksumStore, ChecksumStoreMut};
pub use dividend::{DividendInfo, DividendStore, DividendStoreMut};
pub use error::StoreError;
pub use frontier::{FrontierStore, FrontierStoreMut};
pub use meta::{MetaStore, MetaStoreMut, STORE_VERSION};
pub use pending::{PendingInfo, PendingKey, PendingStore, PendingStoreMut};
pub use representation::{RepresentationStore, RepresentationStoreMut};
pub use table::Table;
pub use unchecked::{UncheckedKey, UncheckedStore, UncheckedStoreMut};
pub use vote::{VoteStore, VoteStoreMut};

/// A key/value pair returned by range scans.
pub type Entry = (Vec<u8>, Vec<u8>);

/// Read access to the store. All typed readers build on these primitives.
pub trait Transaction {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Entries with `start <= key < end` in ascending key order, at most `limit`.
    /// An `end` of `None` scans to the end of the table.
    fn range(
        &self,
        table: Table,
        start: &[u8],
        end: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<Entry>, StoreError>;

    fn count(&self, table: Table) -> Result<u64, StoreError>;

    fn exists(&self, table: Table, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(table, key)?.is_some())
    }
}

/// Read-write access. Dropping a write transaction without committing
/// discards every change made through it.
pub trait WriteTransaction: Transaction {
    fn put(&mut self, table: Table, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    fn delete(&mut self, table: Table, key: &[u8]) -> Result<(), StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// View this transaction as a read transaction.
    fn as_read(&self) -> &dyn Transaction;
}

/// A transactional key/value store with single-writer semantics.
pub trait Store: Send + Sync {
    fn tx_begin_read(&self) -> Result<Box<dyn Transaction + '_>, StoreError>;

    /// Blocks until no other write transaction is open.
    fn tx_begin_write(&self) -> Result<Box<dyn WriteTransaction + '_>, StoreError>;
}

/// Smallest key strictly greater than every key starting with `prefix`,
/// or `None` when the prefix is all `0xFF`.
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_end_increments_last_byte() {
        assert_eq!(prefix_end(&[1, 2, 3]), Some(vec![1, 2, 4]));
    }

    #[test]
    fn prefix_end_carries_over_ff() {
        assert_eq!(prefix_end(&[1, 0xFF, 0xFF]), Some(vec![2]));
        assert_eq!(prefix_end(&[0xFF, 0xFF]), None);
    }
}
