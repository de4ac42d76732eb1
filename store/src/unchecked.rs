//! Blocks waiting on a missing dependency.

use crate::codec::{decode, encode, pair_key, split_pair_key};
use crate::{prefix_end, StoreError, Table, Transaction, WriteTransaction};
use lattice_types::BlockHash;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// (missing dependency, hash of the waiting block)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UncheckedKey {
    pub dependency: BlockHash,
    pub hash: BlockHash,
}

impl UncheckedKey {
    pub fn new(dependency: BlockHash, hash: BlockHash) -> Self {
        Self { dependency, hash }
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        pair_key(self.dependency.as_bytes(), self.hash.as_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        let (dependency, hash) = split_pair_key(bytes)?;
        Ok(Self::new(BlockHash::new(dependency), BlockHash::new(hash)))
    }
}

pub trait UncheckedStore: Transaction {
    /// Every entry waiting on `dependency`.
    fn unchecked_get<V: DeserializeOwned>(
        &self,
        dependency: &BlockHash,
    ) -> Result<Vec<(UncheckedKey, V)>, StoreError> {
        let prefix = dependency.as_bytes();
        let end = prefix_end(prefix);
        self.range(Table::Unchecked, prefix, end.as_deref(), usize::MAX)?
            .into_iter()
            .map(|(k, v)| Ok((UncheckedKey::from_bytes(&k)?, decode(&v)?)))
            .collect()
    }

    fn unchecked_all<V: DeserializeOwned>(&self) -> Result<Vec<(UncheckedKey, V)>, StoreError> {
        self.range(Table::Unchecked, &[], None, usize::MAX)?
            .into_iter()
            .map(|(k, v)| Ok((UncheckedKey::from_bytes(&k)?, decode(&v)?)))
            .collect()
    }

    fn unchecked_count(&self) -> Result<u64, StoreError> {
        self.count(Table::Unchecked)
    }
}

impl<T: Transaction + ?Sized> UncheckedStore for T {}

pub trait UncheckedStoreMut: WriteTransaction {
    fn unchecked_put<V: Serialize + ?Sized>(&mut self, key: &UncheckedKey, value: &V) -> Result<(), StoreError> {
        let value = encode(value)?;
        self.put(Table::Unchecked, &key.to_bytes(), &value)
    }

    fn unchecked_del(&mut self, key: &UncheckedKey) -> Result<(), StoreError> {
        self.delete(Table::Unchecked, &key.to_bytes())
    }
}

impl<T: WriteTransaction + ?Sized> UncheckedStoreMut for T {}
