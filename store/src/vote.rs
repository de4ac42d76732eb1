//! Highest-sequence vote seen per representative.
//!
//! The vote model lives above the store, so votes are any serde type.

use crate::codec::{decode, encode};
use crate::{StoreError, Table, Transaction, WriteTransaction};
use lattice_types::Account;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub trait VoteStore: Transaction {
    fn vote_get<V: DeserializeOwned>(&self, representative: &Account) -> Result<Option<V>, StoreError> {
        self.get(Table::Votes, representative.as_bytes())?
            .map(|v| decode(&v))
            .transpose()
    }
}

impl<T: Transaction + ?Sized> VoteStore for T {}

pub trait VoteStoreMut: WriteTransaction {
    fn vote_put<V: Serialize + ?Sized>(&mut self, representative: &Account, vote: &V) -> Result<(), StoreError> {
        let value = encode(vote)?;
        self.put(Table::Votes, representative.as_bytes(), &value)
    }
}

impl<T: WriteTransaction + ?Sized> VoteStoreMut for T {}
