//! Issued dividends and the claims made against them.

use crate::codec::{account_from_key, decode, encode, pair_key, split_pair_key};
use crate::{prefix_end, StoreError, Table, Transaction, WriteTransaction};
use lattice_types::{Account, Amount, BlockHash};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendInfo {
    /// Account that issued the dividend.
    pub account: Account,
    /// Total amount distributed.
    pub amount: Amount,
    /// Supply outside the issuing account when the dividend was issued.
    /// Each claim receives `balance * amount / eligible_supply`.
    pub eligible_supply: Amount,
    /// Position in the dividend chain, starting at 1.
    pub height: u64,
    /// The dividend this one follows, zero for the first.
    pub previous: BlockHash,
    /// Sum of every claim applied so far.
    pub claimed: Amount,
}

impl DividendInfo {
    pub fn unclaimed(&self) -> Amount {
        self.amount.saturating_sub(self.claimed)
    }
}

pub trait DividendStore: Transaction {
    fn dividend_get(&self, hash: &BlockHash) -> Result<Option<DividendInfo>, StoreError> {
        self.get(Table::Dividends, hash.as_bytes())?
            .map(|v| decode(&v))
            .transpose()
    }

    fn dividends_all(&self) -> Result<Vec<(BlockHash, DividendInfo)>, StoreError> {
        self.range(Table::Dividends, &[], None, usize::MAX)?
            .into_iter()
            .map(|(k, v)| Ok((crate::codec::hash_from_key(&k)?, decode(&v)?)))
            .collect()
    }

    /// Claims recorded against `dividend`: (claim hash, claiming account).
    fn dividend_claims(&self, dividend: &BlockHash) -> Result<Vec<(BlockHash, Account)>, StoreError> {
        let prefix = dividend.as_bytes();
        let end = prefix_end(prefix);
        self.range(Table::DividendClaims, prefix, end.as_deref(), usize::MAX)?
            .into_iter()
            .map(|(k, v)| {
                let (_, claim) = split_pair_key(&k)?;
                Ok((BlockHash::new(claim), account_from_key(&v)?))
            })
            .collect()
    }
}

impl<T: Transaction + ?Sized> DividendStore for T {}

pub trait DividendStoreMut: WriteTransaction {
    fn dividend_put(&mut self, hash: &BlockHash, info: &DividendInfo) -> Result<(), StoreError> {
        let value = encode(info)?;
        self.put(Table::Dividends, hash.as_bytes(), &value)
    }

    fn dividend_del(&mut self, hash: &BlockHash) -> Result<(), StoreError> {
        self.delete(Table::Dividends, hash.as_bytes())
    }

    fn dividend_claim_put(
        &mut self,
        dividend: &BlockHash,
        claim: &BlockHash,
        account: &Account,
    ) -> Result<(), StoreError> {
        let key = pair_key(dividend.as_bytes(), claim.as_bytes());
        self.put(Table::DividendClaims, &key, account.as_bytes())
    }

    fn dividend_claim_del(&mut self, dividend: &BlockHash, claim: &BlockHash) -> Result<(), StoreError> {
        let key = pair_key(dividend.as_bytes(), claim.as_bytes());
        self.delete(Table::DividendClaims, &key)
    }
}

impl<T: WriteTransaction + ?Sized> DividendStoreMut for T {}
