//! The ledger: state transitions over blocks and the query surface.
//!
//! All reads take an explicit transaction, so a caller holding a write
//! transaction queries through [`WriteTransaction::as_read`] instead of
//! opening a second transaction. Representative weights are the exception:
//! they come from the in-memory [`RepWeights`] mirror and need no transaction.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use lattice_store::{
    AccountInfo, AccountStore, AccountStoreMut, BlockStore, BlockStoreMut, ChecksumStore,
    ChecksumStoreMut, DividendInfo, DividendStore, FrontierStoreMut, MetaStore, PendingKey,
    PendingStore, RepresentationStore, RepresentationStoreMut, Store, Transaction,
    WriteTransaction,
};
use lattice_types::{Account, Amount, BlockHash, Epoch, Link, Root, Timestamp};

use crate::block::Block;
use crate::dividend::claim_share;
use crate::genesis::NetworkParams;
use crate::process::Apply;
use crate::process_result::{ProcessReturn, SignatureVerification};
use crate::rep_weights::RepWeights;
use crate::rollback::Rollback;
use crate::sideband::{BlockSideband, StoredBlock};
use crate::LedgerError;

pub struct Ledger {
    store: Arc<dyn Store>,
    params: NetworkParams,
    rep_weights: RepWeights,
    block_count: AtomicU64,
    check_bootstrap_weights: AtomicBool,
}

impl Ledger {
    /// Open the ledger over `store`, inserting the genesis block into an
    /// empty store.
    pub fn new(store: Arc<dyn Store>, params: NetworkParams) -> Result<Self, LedgerError> {
        let ledger = Self {
            store,
            params,
            rep_weights: RepWeights::new(),
            block_count: AtomicU64::new(0),
            check_bootstrap_weights: AtomicBool::new(true),
        };
        {
            let mut txn = ledger.store.tx_begin_write()?;
            if txn.account_count()? == 0 {
                ledger.insert_genesis(txn.as_mut())?;
            } else if !txn.block_exists(&ledger.params.genesis_hash())? {
                let found = txn
                    .account_get(&ledger.params.genesis_account)?
                    .map(|info| info.open_block)
                    .unwrap_or_default();
                return Err(LedgerError::GenesisMismatch {
                    found,
                    expected: ledger.params.genesis_hash(),
                });
            }
            txn.commit()?;
        }
        ledger.reload_caches()?;
        tracing::info!(
            network = ledger.params.network.as_str(),
            genesis = %ledger.params.genesis_hash(),
            blocks = ledger.block_count(),
            "ledger opened"
        );
        Ok(ledger)
    }

    /// Rebuild the in-memory weights and block count from committed state.
    /// Needed after a write transaction is abandoned, since both caches
    /// follow writes before they commit.
    pub fn reload_caches(&self) -> Result<(), LedgerError> {
        let txn = self.store.tx_begin_read()?;
        self.rep_weights.rebuild(txn.representation_all()?);
        self.block_count.store(txn.block_count()?, Ordering::SeqCst);
        Ok(())
    }

    fn insert_genesis(&self, txn: &mut dyn WriteTransaction) -> Result<(), LedgerError> {
        let block = &self.params.genesis_block;
        let hash = block.hash();
        let account = self.params.genesis_account;
        let amount = self.params.genesis_amount;
        let stored = StoredBlock {
            block: block.clone(),
            sideband: BlockSideband {
                account,
                height: 1,
                balance: amount,
                representative: account,
                rep_block: hash,
                dividend: BlockHash::ZERO,
                epoch: Epoch::Epoch0,
                timestamp: Timestamp::now(),
            },
        };
        txn.block_put(&hash, &stored)?;
        txn.account_put(
            &account,
            &AccountInfo {
                head: hash,
                open_block: hash,
                rep_block: hash,
                balance: amount,
                dividend: BlockHash::ZERO,
                modified: Timestamp::now(),
                block_count: 1,
                epoch: Epoch::Epoch0,
            },
        )?;
        txn.representation_put(&account, amount)?;
        txn.frontier_put(&hash, &account)?;
        txn.checksum_put(0, 0, &hash)?;
        tracing::info!(genesis = %hash, account = %account, "genesis block inserted");
        Ok(())
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    /// Validate `block` and apply it when valid.
    pub fn process(
        &self,
        txn: &mut dyn WriteTransaction,
        block: &Block,
    ) -> Result<ProcessReturn, LedgerError> {
        self.process_verified(txn, block, SignatureVerification::Unknown)
    }

    /// As [`process`](Self::process), skipping the signature check when the
    /// caller already verified it.
    pub fn process_verified(
        &self,
        txn: &mut dyn WriteTransaction,
        block: &Block,
        verified: SignatureVerification,
    ) -> Result<ProcessReturn, LedgerError> {
        Apply::new(self, txn, verified).process(block)
    }

    /// Roll back the chain owning `hash` down to and including `hash`, first
    /// rolling back whatever depends on the removed blocks. Returns the
    /// removed blocks, newest first.
    pub fn rollback(
        &self,
        txn: &mut dyn WriteTransaction,
        hash: &BlockHash,
    ) -> Result<Vec<Block>, LedgerError> {
        Rollback::new(self, txn).rollback(hash)
    }

    /// Whether every dependency of `block` is present, so it could be
    /// processed without a gap.
    pub fn could_fit(&self, txn: &dyn Transaction, block: &Block) -> Result<bool, LedgerError> {
        let previous = block.previous();
        if !previous.is_zero() && !txn.block_exists(&previous)? {
            return Ok(false);
        }
        let fits = match block {
            Block::Open(b) => txn.block_exists(&b.source)?,
            Block::Receive(b) => txn.block_exists(&b.source)?,
            Block::Send(_) | Block::Change(_) => true,
            Block::State(b) => {
                if b.link.is_zero() || self.is_epoch_link(&b.link) {
                    true
                } else if txn.block_exists(&b.link.as_block_hash())? {
                    true
                } else {
                    // A send links an account, not a block.
                    !previous.is_zero() && b.balance < self.balance_or_zero(txn, &previous)?
                }
            }
            Block::Dividend(b) => b.dividend.is_zero() || txn.dividend_get(&b.dividend)?.is_some(),
            Block::Claim(b) => txn.dividend_get(&b.dividend)?.is_some(),
        };
        Ok(fits)
    }

    pub fn account_info(
        &self,
        txn: &dyn Transaction,
        account: &Account,
    ) -> Result<Option<AccountInfo>, LedgerError> {
        Ok(txn.account_get(account)?)
    }

    pub fn account_balance(&self, txn: &dyn Transaction, account: &Account) -> Result<Amount, LedgerError> {
        Ok(txn.account_get(account)?.map(|i| i.balance).unwrap_or_default())
    }

    /// Sum of every amount sent to `account` and not yet received.
    pub fn account_pending(&self, txn: &dyn Transaction, account: &Account) -> Result<Amount, LedgerError> {
        Ok(txn
            .pending_for_account(account)?
            .into_iter()
            .fold(Amount::ZERO, |sum, (_, info)| sum.saturating_add(info.amount)))
    }

    /// Voting weight delegated to `account`.
    ///
    /// While the ledger holds fewer than `bootstrap_weight_max_blocks` blocks,
    /// configured bootstrap weights take precedence.
    pub fn weight(&self, account: &Account) -> Amount {
        if self.check_bootstrap_weights.load(Ordering::Relaxed) {
            if self.block_count() < self.params.bootstrap_weight_max_blocks {
                if let Some(weight) = self.params.bootstrap_weights.get(account) {
                    return *weight;
                }
            } else {
                self.check_bootstrap_weights.store(false, Ordering::Relaxed);
            }
        }
        self.rep_weights.weight(account)
    }

    pub fn rep_weights(&self) -> &RepWeights {
        &self.rep_weights
    }

    pub fn block_count(&self) -> u64 {
        self.block_count.load(Ordering::SeqCst)
    }

    pub(crate) fn block_count_add(&self, delta: i64) {
        if delta >= 0 {
            self.block_count.fetch_add(delta as u64, Ordering::SeqCst);
        } else {
            self.block_count.fetch_sub(delta.unsigned_abs(), Ordering::SeqCst);
        }
    }

    /// Head block of `account`, zero when the account is not open.
    pub fn latest(&self, txn: &dyn Transaction, account: &Account) -> Result<BlockHash, LedgerError> {
        Ok(txn.account_get(account)?.map(|i| i.head).unwrap_or_default())
    }

    /// Root the next block of `account` would have.
    pub fn latest_root(&self, txn: &dyn Transaction, account: &Account) -> Result<Root, LedgerError> {
        Ok(match txn.account_get(account)? {
            Some(info) => Root::from(info.head),
            None => Root::from(*account),
        })
    }

    pub fn block_exists(&self, txn: &dyn Transaction, hash: &BlockHash) -> Result<bool, LedgerError> {
        Ok(txn.block_exists(hash)?)
    }

    pub fn get_block(&self, txn: &dyn Transaction, hash: &BlockHash) -> Result<Option<Block>, LedgerError> {
        Ok(self.get_stored(txn, hash)?.map(|s| s.block))
    }

    pub fn get_stored(
        &self,
        txn: &dyn Transaction,
        hash: &BlockHash,
    ) -> Result<Option<StoredBlock>, LedgerError> {
        Ok(txn.block_get::<StoredBlock>(hash)?)
    }

    pub(crate) fn stored_or_err(
        &self,
        txn: &dyn Transaction,
        hash: &BlockHash,
    ) -> Result<StoredBlock, LedgerError> {
        self.get_stored(txn, hash)?
            .ok_or(LedgerError::BlockNotFound(*hash))
    }

    /// Account balance after the block `hash`.
    pub fn balance(&self, txn: &dyn Transaction, hash: &BlockHash) -> Result<Option<Amount>, LedgerError> {
        Ok(self.get_stored(txn, hash)?.map(|s| s.sideband.balance))
    }

    pub(crate) fn balance_or_zero(&self, txn: &dyn Transaction, hash: &BlockHash) -> Result<Amount, LedgerError> {
        if hash.is_zero() {
            return Ok(Amount::ZERO);
        }
        Ok(self.balance(txn, hash)?.unwrap_or_default())
    }

    /// Value moved by the block `hash`: the balance difference to its
    /// predecessor, or the full balance of a chain's first block.
    pub fn amount(&self, txn: &dyn Transaction, hash: &BlockHash) -> Result<Option<Amount>, LedgerError> {
        let Some(stored) = self.get_stored(txn, hash)? else {
            return Ok(None);
        };
        let previous = stored.block.previous();
        let before = self.balance_or_zero(txn, &previous)?;
        let after = stored.sideband.balance;
        Ok(Some(if after > before { after - before } else { before - after }))
    }

    pub fn block_account(&self, txn: &dyn Transaction, hash: &BlockHash) -> Result<Option<Account>, LedgerError> {
        Ok(self.get_stored(txn, hash)?.map(|s| s.sideband.account))
    }

    /// Representative in effect after the block `hash`.
    pub fn representative(&self, txn: &dyn Transaction, hash: &BlockHash) -> Result<Option<Account>, LedgerError> {
        Ok(self.get_stored(txn, hash)?.map(|s| s.sideband.representative))
    }

    /// Whether a state block decreases its account's balance.
    pub fn is_send(&self, txn: &dyn Transaction, block: &Block) -> Result<bool, LedgerError> {
        match block {
            Block::Send(_) => Ok(true),
            Block::State(b) => {
                if b.previous.is_zero() {
                    return Ok(false);
                }
                Ok(b.balance < self.balance_or_zero(txn, &b.previous)?)
            }
            _ => Ok(false),
        }
    }

    /// The send a receiving block consumes, zero for anything else.
    pub fn block_source(&self, txn: &dyn Transaction, block: &Block) -> Result<BlockHash, LedgerError> {
        Ok(match block {
            Block::Open(b) => b.source,
            Block::Receive(b) => b.source,
            Block::State(b) if !self.is_epoch_link(&b.link) && !b.link.is_zero() => {
                if self.is_send(txn, block)? {
                    BlockHash::ZERO
                } else {
                    b.link.as_block_hash()
                }
            }
            _ => BlockHash::ZERO,
        })
    }

    /// Destination account of a send, zero for anything else.
    pub fn block_destination(&self, txn: &dyn Transaction, block: &Block) -> Result<Account, LedgerError> {
        Ok(match block {
            Block::Send(b) => b.destination,
            Block::State(b) if self.is_send(txn, block)? => b.link.as_account(),
            _ => Account::ZERO,
        })
    }

    /// The block following `root`: the open block when `root` is an account,
    /// otherwise the successor of the block `root` names.
    pub fn successor(&self, txn: &dyn Transaction, root: &Root) -> Result<Option<Block>, LedgerError> {
        let hash = root.as_block_hash();
        let successor = if txn.block_exists(&hash)? {
            txn.block_successor(&hash)?
        } else {
            txn.account_get(&root.as_account())?
                .map(|info| info.open_block)
                .unwrap_or_default()
        };
        if successor.is_zero() {
            return Ok(None);
        }
        self.get_block(txn, &successor)
    }

    /// The ledger block occupying the same slot as `block`.
    pub fn forked_block(&self, txn: &dyn Transaction, block: &Block) -> Result<Option<Block>, LedgerError> {
        self.successor(txn, &block.root())
    }

    pub fn is_epoch_link(&self, link: &Link) -> bool {
        self.params.is_epoch_link(link)
    }

    pub fn epoch_signer(&self) -> Account {
        self.params.epoch_signer
    }

    /// XOR of the head hashes of every account in `[begin, end]`.
    pub fn checksum(
        &self,
        txn: &dyn Transaction,
        begin: &Account,
        end: &Account,
    ) -> Result<BlockHash, LedgerError> {
        if begin.is_zero() && *end.as_bytes() == [0xFF; 32] {
            return Ok(txn.checksum_get(0, 0)?);
        }
        let mut result = BlockHash::ZERO;
        for (_, info) in txn.accounts_between(begin, end)? {
            result.xor_assign(&info.head);
        }
        Ok(result)
    }

    pub(crate) fn checksum_toggle(
        &self,
        txn: &mut dyn WriteTransaction,
        hash: &BlockHash,
    ) -> Result<(), LedgerError> {
        let mut value = txn.checksum_get(0, 0)?;
        value.xor_assign(hash);
        txn.checksum_put(0, 0, &value)?;
        Ok(())
    }

    pub(crate) fn weight_add(
        &self,
        txn: &mut dyn WriteTransaction,
        rep: &Account,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }
        let current = txn.representation_get(rep)?;
        txn.representation_put(rep, current.saturating_add(amount))?;
        self.rep_weights.add(rep, amount);
        Ok(())
    }

    pub(crate) fn weight_sub(
        &self,
        txn: &mut dyn WriteTransaction,
        rep: &Account,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }
        let current = txn.representation_get(rep)?;
        let updated = current.checked_sub(amount).ok_or_else(|| {
            LedgerError::Inconsistent(format!("weight of {rep} would go negative"))
        })?;
        txn.representation_put(rep, updated)?;
        self.rep_weights.sub(rep, amount);
        Ok(())
    }

    pub fn latest_dividend(&self, txn: &dyn Transaction) -> Result<BlockHash, LedgerError> {
        Ok(txn.latest_dividend_get()?)
    }

    pub fn dividend_info(
        &self,
        txn: &dyn Transaction,
        hash: &BlockHash,
    ) -> Result<Option<DividendInfo>, LedgerError> {
        Ok(txn.dividend_get(hash)?)
    }

    /// Position of `hash` in the dividend chain; zero for no dividend.
    pub(crate) fn dividend_height(&self, txn: &dyn Transaction, hash: &BlockHash) -> Result<u64, LedgerError> {
        if hash.is_zero() {
            return Ok(0);
        }
        txn.dividend_get(hash)?
            .map(|info| info.height)
            .ok_or_else(|| LedgerError::Inconsistent(format!("unknown dividend {hash}")))
    }

    /// The dividend `account` can claim next, with its share at the current
    /// balance. `None` when the account is up to date, not open, or is the
    /// issuer.
    pub fn next_claim(
        &self,
        txn: &dyn Transaction,
        account: &Account,
    ) -> Result<Option<(BlockHash, Amount)>, LedgerError> {
        if *account == self.params.dividend_account {
            return Ok(None);
        }
        let Some(info) = txn.account_get(account)? else {
            return Ok(None);
        };
        let mut cursor = txn.latest_dividend_get()?;
        while !cursor.is_zero() {
            let Some(dividend) = txn.dividend_get(&cursor)? else {
                break;
            };
            if dividend.previous == info.dividend {
                let share = claim_share(info.balance, &dividend).unwrap_or_default();
                return Ok(Some((cursor, share)));
            }
            cursor = dividend.previous;
        }
        Ok(None)
    }

    /// Whether `account` has pending entries tagged older than the dividend
    /// at `height`.
    pub(crate) fn has_pending_before(
        &self,
        txn: &dyn Transaction,
        account: &Account,
        height: u64,
    ) -> Result<bool, LedgerError> {
        for (_, info) in txn.pending_for_account(account)? {
            if self.dividend_height(txn, &info.dividend)? < height {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Representation plus pending plus unclaimed dividend pools. Equals the
    /// genesis amount in every consistent state.
    pub fn conserved_supply(&self, txn: &dyn Transaction) -> Result<Amount, LedgerError> {
        let mut total = Amount::ZERO;
        for (_, weight) in txn.representation_all()? {
            total = total.saturating_add(weight);
        }
        for (_, info) in txn.pending_all()? {
            total = total.saturating_add(info.amount);
        }
        for (_, info) in txn.dividends_all()? {
            total = total.saturating_add(info.unclaimed());
        }
        Ok(total)
    }

    pub fn pending_exists(
        &self,
        txn: &dyn Transaction,
        destination: &Account,
        send: &BlockHash,
    ) -> Result<bool, LedgerError> {
        Ok(txn.pending_exists(&PendingKey::new(*destination, *send))?)
    }
}
