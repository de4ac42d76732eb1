//! Rolling XOR checksum of account heads.
//!
//! Entries are keyed by a (prefix, mask) pair. The ledger maintains the
//! whole-ledger entry at (0, 0).

use crate::codec::hash_from_key;
use crate::{StoreError, Table, Transaction, WriteTransaction};
use lattice_types::BlockHash;

fn checksum_key(prefix: u64, mask: u8) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[..8].copy_from_slice(&prefix.to_be_bytes());
    key[8] = mask;
    key
}

pub trait ChecksumStore: Transaction {
    /// Missing entries read as zero.
    fn checksum_get(&self, prefix: u64, mask: u8) -> Result<BlockHash, StoreError> {
        match self.get(Table::Checksum, &checksum_key(prefix, mask))? {
            Some(v) => hash_from_key(&v),
            None => Ok(BlockHash::ZERO),
        }
    }
}

impl<T: Transaction + ?Sized> ChecksumStore for T {}

pub trait ChecksumStoreMut: WriteTransaction {
    fn checksum_put(&mut self, prefix: u64, mask: u8, value: &BlockHash) -> Result<(), StoreError> {
        self.put(Table::Checksum, &checksum_key(prefix, mask), value.as_bytes())
    }

    fn checksum_del(&mut self, prefix: u64, mask: u8) -> Result<(), StoreError> {
        self.delete(Table::Checksum, &checksum_key(prefix, mask))
    }
}

impl<T: WriteTransaction + ?Sized> ChecksumStoreMut for T {}
