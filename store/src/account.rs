//! Account metadata.

use crate::codec::{account_from_key, decode, encode};
use crate::{StoreError, Table, Transaction, WriteTransaction};
use lattice_types::{Account, Amount, BlockHash, Epoch, Timestamp};
use serde::{Deserialize, Serialize};

/// Denormalized per-account state maintained by the ledger alongside raw blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Latest block in the account's chain.
    pub head: BlockHash,
    /// First block of the chain.
    pub open_block: BlockHash,
    /// Most recent block that set the representative.
    pub rep_block: BlockHash,
    pub balance: Amount,
    /// Latest dividend this account has accounted for.
    pub dividend: BlockHash,
    pub modified: Timestamp,
    pub block_count: u64,
    pub epoch: Epoch,
}

pub trait AccountStore: Transaction {
    fn account_get(&self, account: &Account) -> Result<Option<AccountInfo>, StoreError> {
        self.get(Table::Accounts, account.as_bytes())?
            .map(|v| decode(&v))
            .transpose()
    }

    fn account_exists(&self, account: &Account) -> Result<bool, StoreError> {
        self.exists(Table::Accounts, account.as_bytes())
    }

    fn account_count(&self) -> Result<u64, StoreError> {
        self.count(Table::Accounts)
    }

    /// Accounts in key order starting at `start`, at most `limit`.
    fn accounts_from(
        &self,
        start: &Account,
        limit: usize,
    ) -> Result<Vec<(Account, AccountInfo)>, StoreError> {
        self.range(Table::Accounts, start.as_bytes(), None, limit)?
            .into_iter()
            .map(|(k, v)| Ok((account_from_key(&k)?, decode(&v)?)))
            .collect()
    }

    /// Accounts with `begin <= account <= end`.
    fn accounts_between(
        &self,
        begin: &Account,
        end: &Account,
    ) -> Result<Vec<(Account, AccountInfo)>, StoreError> {
        let mut result = self.accounts_from(begin, usize::MAX)?;
        result.retain(|(a, _)| a <= end);
        Ok(result)
    }
}

impl<T: Transaction + ?Sized> AccountStore for T {}

pub trait AccountStoreMut: WriteTransaction {
    fn account_put(&mut self, account: &Account, info: &AccountInfo) -> Result<(), StoreError> {
        let value = encode(info)?;
        self.put(Table::Accounts, account.as_bytes(), &value)
    }

    fn account_del(&mut self, account: &Account) -> Result<(), StoreError> {
        self.delete(Table::Accounts, account.as_bytes())
    }
}

impl<T: WriteTransaction + ?Sized> AccountStoreMut for T {}
