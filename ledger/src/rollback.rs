//! Inverse of block application.
//!
//! Blocks are removed from the head of their chain one at a time. Before a
//! block goes, everything built on it elsewhere in the ledger goes first: the
//! receive of a send, and every claim of a dividend.

use lattice_store::{
    AccountInfo, AccountStore, AccountStoreMut, BlockStore, BlockStoreMut, DividendStore,
    DividendStoreMut, FrontierStoreMut, MetaStoreMut, PendingInfo, PendingKey, PendingStore,
    PendingStoreMut, WriteTransaction,
};
use lattice_types::{Account, Amount, BlockHash, Timestamp};

use crate::block::Block;
use crate::ledger::Ledger;
use crate::sideband::StoredBlock;
use crate::LedgerError;

pub(crate) struct Rollback<'a> {
    ledger: &'a Ledger,
    txn: &'a mut dyn WriteTransaction,
    removed: Vec<Block>,
}

impl<'a> Rollback<'a> {
    pub(crate) fn new(ledger: &'a Ledger, txn: &'a mut dyn WriteTransaction) -> Self {
        Self {
            ledger,
            txn,
            removed: Vec::new(),
        }
    }

    pub(crate) fn rollback(mut self, hash: &BlockHash) -> Result<Vec<Block>, LedgerError> {
        self.rollback_to(hash)?;
        Ok(self.removed)
    }

    fn stored(&self, hash: &BlockHash) -> Result<StoredBlock, LedgerError> {
        self.ledger.stored_or_err(self.txn.as_read(), hash)
    }

    fn rollback_to(&mut self, hash: &BlockHash) -> Result<(), LedgerError> {
        let account = self.stored(hash)?.sideband.account;
        while self.txn.block_exists(hash)? {
            let info = self.txn.account_get(&account)?.ok_or_else(|| {
                LedgerError::Inconsistent(format!("account {account} of block {hash} missing"))
            })?;
            self.rollback_head(&account, &info)?;
        }
        Ok(())
    }

    fn rollback_head(&mut self, account: &Account, info: &AccountInfo) -> Result<(), LedgerError> {
        let head = info.head;
        if head == self.ledger.params().genesis_hash() {
            return Err(LedgerError::Inconsistent(
                "the genesis block cannot be rolled back".to_string(),
            ));
        }
        let stored = self.stored(&head)?;
        let block = &stored.block;
        let previous = block.previous();
        let prev = if previous.is_zero() {
            None
        } else {
            Some(self.stored(&previous)?)
        };
        let prev_balance = prev.as_ref().map(|p| p.sideband.balance).unwrap_or_default();
        let balance = stored.sideband.balance;

        match block {
            Block::Send(send) => self.undo_send(&send.destination, &head)?,
            Block::Open(open) => self.undo_receive(account, &open.source, balance)?,
            Block::Receive(receive) => {
                self.undo_receive(account, &receive.source, balance - prev_balance)?
            }
            Block::Change(_) => {}
            Block::State(state) => {
                if self.ledger.is_epoch_link(&state.link) {
                    // Epoch upgrades only move the epoch, restored below.
                } else if balance < prev_balance {
                    self.undo_send(&state.link.as_account(), &head)?;
                } else if balance > prev_balance || prev.is_none() {
                    self.undo_receive(account, &state.link.as_block_hash(), balance - prev_balance)?;
                }
            }
            Block::Dividend(dividend) => self.undo_dividend(&head, &dividend.dividend)?,
            Block::Claim(claim) => self.undo_claim(&head, &claim.dividend, balance - prev_balance)?,
        }

        self.ledger
            .weight_sub(&mut *self.txn, &stored.sideband.representative, balance)?;
        match &prev {
            Some(p) => {
                self.ledger
                    .weight_add(&mut *self.txn, &p.sideband.representative, p.sideband.balance)?;
                self.txn.account_put(
                    account,
                    &AccountInfo {
                        head: previous,
                        open_block: info.open_block,
                        rep_block: p.sideband.rep_block,
                        balance: p.sideband.balance,
                        dividend: p.sideband.dividend,
                        modified: Timestamp::now(),
                        block_count: p.sideband.height,
                        epoch: p.sideband.epoch,
                    },
                )?;
                self.txn.block_successor_set(&previous, &BlockHash::ZERO)?;
                if !p.block.is_state_era() {
                    self.txn.frontier_put(&previous, account)?;
                }
                self.ledger.checksum_toggle(&mut *self.txn, &previous)?;
            }
            None => self.txn.account_del(account)?,
        }
        if !block.is_state_era() {
            self.txn.frontier_del(&head)?;
        }
        self.ledger.checksum_toggle(&mut *self.txn, &head)?;
        self.txn.block_del(&head)?;
        self.ledger.block_count_add(-1);

        tracing::debug!(
            block_hash = %head,
            account = %account,
            block_type = block.block_type().as_str(),
            "block rolled back"
        );
        self.removed.push(stored.block);
        Ok(())
    }

    /// Remove the pending entry of a send, first rolling back the
    /// destination until the entry is unreceived again.
    fn undo_send(&mut self, destination: &Account, send: &BlockHash) -> Result<(), LedgerError> {
        let key = PendingKey::new(*destination, *send);
        while !self.txn.pending_exists(&key)? {
            let latest = self.ledger.latest(self.txn.as_read(), destination)?;
            if latest.is_zero() {
                return Err(LedgerError::Inconsistent(format!(
                    "send {send} is neither pending nor received"
                )));
            }
            self.rollback_to(&latest)?;
        }
        self.txn.pending_del(&key)?;
        Ok(())
    }

    /// Recreate the pending entry a receive consumed.
    fn undo_receive(
        &mut self,
        account: &Account,
        source: &BlockHash,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let source_block = self.stored(source)?;
        let pending = PendingInfo {
            source: source_block.sideband.account,
            amount,
            epoch: source_block.sideband.epoch,
            dividend: source_block.sideband.dividend,
        };
        self.txn
            .pending_put(&PendingKey::new(*account, *source), &pending)?;
        Ok(())
    }

    fn undo_dividend(&mut self, hash: &BlockHash, previous_dividend: &BlockHash) -> Result<(), LedgerError> {
        for (claim, _) in self.txn.dividend_claims(hash)? {
            if self.txn.block_exists(&claim)? {
                self.rollback_to(&claim)?;
            }
        }
        self.txn.dividend_del(hash)?;
        self.txn.latest_dividend_put(previous_dividend)?;
        Ok(())
    }

    fn undo_claim(&mut self, hash: &BlockHash, dividend: &BlockHash, share: Amount) -> Result<(), LedgerError> {
        let mut info = self.txn.dividend_get(dividend)?.ok_or_else(|| {
            LedgerError::Inconsistent(format!("claim {hash} of unknown dividend {dividend}"))
        })?;
        info.claimed = info.claimed.saturating_sub(share);
        self.txn.dividend_put(dividend, &info)?;
        self.txn.dividend_claim_del(dividend, hash)?;
        Ok(())
    }
}
