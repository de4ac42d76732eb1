//! Raw block storage and successor links.
//!
//! The store does not know the block model; blocks are any serde type and
//! are stored bincode-encoded under their hash.

use crate::codec::{decode, encode, hash_from_key};
use crate::{StoreError, Table, Transaction, WriteTransaction};
use lattice_types::BlockHash;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub trait BlockStore: Transaction {
    fn block_get<B: DeserializeOwned>(&self, hash: &BlockHash) -> Result<Option<B>, StoreError> {
        self.get(Table::Blocks, hash.as_bytes())?
            .map(|v| decode(&v))
            .transpose()
    }

    fn block_exists(&self, hash: &BlockHash) -> Result<bool, StoreError> {
        self.exists(Table::Blocks, hash.as_bytes())
    }

    fn block_count(&self) -> Result<u64, StoreError> {
        self.count(Table::Blocks)
    }

    /// The block following `hash` in its chain, or zero at the head.
    fn block_successor(&self, hash: &BlockHash) -> Result<BlockHash, StoreError> {
        match self.get(Table::Successors, hash.as_bytes())? {
            Some(v) => hash_from_key(&v),
            None => Ok(BlockHash::ZERO),
        }
    }

    /// First stored block hash at or after `start`, wrapping to the beginning.
    fn block_hash_at_or_after(&self, start: &BlockHash) -> Result<Option<BlockHash>, StoreError> {
        let mut found = self.range(Table::Blocks, start.as_bytes(), None, 1)?;
        if found.is_empty() {
            found = self.range(Table::Blocks, &[], None, 1)?;
        }
        found
            .into_iter()
            .next()
            .map(|(k, _)| hash_from_key(&k))
            .transpose()
    }
}

impl<T: Transaction + ?Sized> BlockStore for T {}

pub trait BlockStoreMut: WriteTransaction {
    fn block_put<B: Serialize + ?Sized>(&mut self, hash: &BlockHash, block: &B) -> Result<(), StoreError> {
        let value = encode(block)?;
        self.put(Table::Blocks, hash.as_bytes(), &value)
    }

    /// Deletes the block and its own successor link.
    fn block_del(&mut self, hash: &BlockHash) -> Result<(), StoreError> {
        self.delete(Table::Blocks, hash.as_bytes())?;
        self.delete(Table::Successors, hash.as_bytes())
    }

    /// Set or clear (with zero) the successor of `hash`.
    fn block_successor_set(&mut self, hash: &BlockHash, successor: &BlockHash) -> Result<(), StoreError> {
        if successor.is_zero() {
            self.delete(Table::Successors, hash.as_bytes())
        } else {
            self.put(Table::Successors, hash.as_bytes(), successor.as_bytes())
        }
    }
}

impl<T: WriteTransaction + ?Sized> BlockStoreMut for T {}
