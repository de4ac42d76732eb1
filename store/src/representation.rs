//! Delegated voting weight per representative.

use crate::codec::{account_from_key, decode, encode};
use crate::{StoreError, Table, Transaction, WriteTransaction};
use lattice_types::{Account, Amount};

pub trait RepresentationStore: Transaction {
    fn representation_get(&self, representative: &Account) -> Result<Amount, StoreError> {
        Ok(self
            .get(Table::Representation, representative.as_bytes())?
            .map(|v| decode(&v))
            .transpose()?
            .unwrap_or(Amount::ZERO))
    }

    fn representation_all(&self) -> Result<Vec<(Account, Amount)>, StoreError> {
        self.range(Table::Representation, &[], None, usize::MAX)?
            .into_iter()
            .map(|(k, v)| Ok((account_from_key(&k)?, decode(&v)?)))
            .collect()
    }
}

impl<T: Transaction + ?Sized> RepresentationStore for T {}

pub trait RepresentationStoreMut: WriteTransaction {
    /// Zero weights are removed rather than stored.
    fn representation_put(&mut self, representative: &Account, weight: Amount) -> Result<(), StoreError> {
        if weight.is_zero() {
            self.delete(Table::Representation, representative.as_bytes())
        } else {
            let value = encode(&weight)?;
            self.put(Table::Representation, representative.as_bytes(), &value)
        }
    }
}

impl<T: WriteTransaction + ?Sized> RepresentationStoreMut for T {}
