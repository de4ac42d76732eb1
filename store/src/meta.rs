//! Store-wide metadata: schema version and the dividend chain head.

use crate::codec::{decode, encode, hash_from_key};
use crate::{StoreError, Table, Transaction, WriteTransaction};
use lattice_types::BlockHash;

pub const STORE_VERSION: u32 = 1;

const VERSION_KEY: &[u8] = b"version";
const LATEST_DIVIDEND_KEY: &[u8] = b"latest_dividend";

pub trait MetaStore: Transaction {
    fn version_get(&self) -> Result<Option<u32>, StoreError> {
        self.get(Table::Meta, VERSION_KEY)?
            .map(|v| decode(&v))
            .transpose()
    }

    /// Hash of the most recent dividend, zero when none was issued.
    fn latest_dividend_get(&self) -> Result<BlockHash, StoreError> {
        match self.get(Table::Meta, LATEST_DIVIDEND_KEY)? {
            Some(v) => hash_from_key(&v),
            None => Ok(BlockHash::ZERO),
        }
    }
}

impl<T: Transaction + ?Sized> MetaStore for T {}

pub trait MetaStoreMut: WriteTransaction {
    fn version_put(&mut self, version: u32) -> Result<(), StoreError> {
        let value = encode(&version)?;
        self.put(Table::Meta, VERSION_KEY, &value)
    }

    fn latest_dividend_put(&mut self, hash: &BlockHash) -> Result<(), StoreError> {
        if hash.is_zero() {
            self.delete(Table::Meta, LATEST_DIVIDEND_KEY)
        } else {
            self.put(Table::Meta, LATEST_DIVIDEND_KEY, hash.as_bytes())
        }
    }
}

impl<T: WriteTransaction + ?Sized> MetaStoreMut for T {}
