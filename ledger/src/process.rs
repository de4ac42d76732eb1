//! Block validation and application.
//!
//! Checks run in a fixed order: duplicate, previous resolution, position,
//! signature, fork, then the per-type rules. Nothing is written until every
//! check has passed, so a rejected block leaves the transaction untouched.

use lattice_store::{
    AccountInfo, AccountStore, AccountStoreMut, BlockStore, BlockStoreMut, DividendInfo,
    DividendStore, DividendStoreMut, FrontierStoreMut, MetaStore, MetaStoreMut, PendingInfo,
    PendingKey, PendingStore, PendingStoreMut, WriteTransaction,
};
use lattice_types::{Account, Amount, BlockHash, Epoch, Timestamp};

use crate::block::{Block, ClaimBlock, DividendBlock, StateBlock};
use crate::dividend::claim_share;
use crate::ledger::Ledger;
use crate::process_result::{ProcessResult, ProcessReturn, SignatureVerification};
use crate::sideband::{BlockSideband, StoredBlock};
use crate::LedgerError;

type Outcome = Result<ProcessReturn, LedgerError>;

/// How a validated block changes its account.
struct Transition {
    account: Account,
    previous: Option<AccountInfo>,
    previous_rep: Account,
    balance: Amount,
    representative: Account,
    /// Whether the block names a representative itself.
    sets_representative: bool,
    dividend: BlockHash,
    epoch: Epoch,
    amount: Amount,
    effect: Effect,
}

/// Where a state-era block lands on its account chain.
struct StatePrevious {
    info: Option<AccountInfo>,
    /// Another block already occupies the slot.
    forked: bool,
}

enum Effect {
    None,
    Send { destination: Account },
    Receive { source: BlockHash },
    Dividend { info: DividendInfo },
    Claim { dividend: BlockHash, share: Amount },
}

pub(crate) struct Apply<'a> {
    ledger: &'a Ledger,
    txn: &'a mut dyn WriteTransaction,
    verified: SignatureVerification,
}

impl<'a> Apply<'a> {
    pub(crate) fn new(
        ledger: &'a Ledger,
        txn: &'a mut dyn WriteTransaction,
        verified: SignatureVerification,
    ) -> Self {
        Self { ledger, txn, verified }
    }

    pub(crate) fn process(&mut self, block: &Block) -> Outcome {
        let hash = block.hash();
        if self.txn.block_exists(&hash)? {
            return Ok(ProcessReturn::new(ProcessResult::Old));
        }
        let result = match block {
            Block::Open(_) | Block::Send(_) | Block::Receive(_) | Block::Change(_) => {
                self.legacy(block, &hash)?
            }
            Block::State(b) => self.state(block, b)?,
            Block::Dividend(b) => self.dividend(block, b, &hash)?,
            Block::Claim(b) => self.claim(block, b)?,
        };
        match result {
            Ok(transition) => {
                let ret = ProcessReturn {
                    code: ProcessResult::Progress,
                    account: transition.account,
                    amount: transition.amount,
                    pending_account: match transition.effect {
                        Effect::Send { destination } => destination,
                        _ => Account::ZERO,
                    },
                    verified: self.verified,
                };
                self.commit(block, &hash, transition)?;
                tracing::trace!(block_hash = %hash, account = %ret.account, "block applied");
                Ok(ret)
            }
            Err(mut ret) => {
                ret.verified = self.verified;
                tracing::trace!(block_hash = %hash, result = ret.code.as_str(), "block rejected");
                Ok(ret)
            }
        }
    }

    fn check_signature(&mut self, block: &Block, signer: &Account, epoch: bool) -> bool {
        let already = if epoch {
            SignatureVerification::ValidEpoch
        } else {
            SignatureVerification::Valid
        };
        if self.verified == already {
            return true;
        }
        if block.verify_signature(signer) {
            self.verified = already;
            true
        } else {
            false
        }
    }

    fn reject(code: ProcessResult, account: Account) -> Result<Transition, ProcessReturn> {
        let mut ret = ProcessReturn::new(code);
        ret.account = account;
        Err(ret)
    }

    fn head_representative(&self, info: &AccountInfo) -> Result<Account, LedgerError> {
        Ok(self
            .ledger
            .stored_or_err(self.txn.as_read(), &info.head)?
            .sideband
            .representative)
    }

    fn dividend_height(&self, hash: &BlockHash) -> Result<u64, LedgerError> {
        self.ledger.dividend_height(self.txn.as_read(), hash)
    }

    fn legacy(
        &mut self,
        block: &Block,
        hash: &BlockHash,
    ) -> Result<Result<Transition, ProcessReturn>, LedgerError> {
        if let Block::Open(open) = block {
            let account = open.account;
            if account == Account::BURN {
                return Ok(Self::reject(ProcessResult::OpenedBurnAccount, account));
            }
            if !self.check_signature(block, &account, false) {
                return Ok(Self::reject(ProcessResult::BadSignature, account));
            }
            if self.txn.account_exists(&account)? {
                return Ok(Self::reject(ProcessResult::Fork, account));
            }
            if !self.txn.block_exists(&open.source)? {
                return Ok(Self::reject(ProcessResult::GapSource, account));
            }
            let key = PendingKey::new(account, open.source);
            let Some(pending) = self.txn.pending_get(&key)? else {
                return Ok(Self::reject(ProcessResult::Unreceivable, account));
            };
            if pending.epoch != Epoch::Epoch0 {
                return Ok(Self::reject(ProcessResult::Unreceivable, account));
            }
            return Ok(Ok(Transition {
                account,
                previous: None,
                previous_rep: Account::ZERO,
                balance: pending.amount,
                representative: open.representative,
                sets_representative: true,
                dividend: pending.dividend,
                epoch: Epoch::Epoch0,
                amount: pending.amount,
                effect: Effect::Receive { source: open.source },
            }));
        }

        let previous = block.previous();
        let Some(prev) = self.ledger.get_stored(self.txn.as_read(), &previous)? else {
            return Ok(Self::reject(ProcessResult::GapPrevious, Account::ZERO));
        };
        let account = prev.sideband.account;
        if prev.block.is_state_era() {
            return Ok(Self::reject(ProcessResult::BlockPosition, account));
        }
        if !self.check_signature(block, &account, false) {
            return Ok(Self::reject(ProcessResult::BadSignature, account));
        }
        let info = self
            .txn
            .account_get(&account)?
            .ok_or_else(|| LedgerError::Inconsistent(format!("block {previous} has no account")))?;
        if info.head != previous {
            return Ok(Self::reject(ProcessResult::Fork, account));
        }
        let previous_rep = prev.sideband.representative;
        let mut transition = Transition {
            account,
            previous: Some(info.clone()),
            previous_rep,
            balance: info.balance,
            representative: previous_rep,
            sets_representative: false,
            dividend: info.dividend,
            epoch: info.epoch,
            amount: Amount::ZERO,
            effect: Effect::None,
        };
        match block {
            Block::Send(send) => {
                if send.balance >= info.balance {
                    return Ok(Self::reject(ProcessResult::NegativeSpend, account));
                }
                transition.balance = send.balance;
                transition.amount = info.balance - send.balance;
                transition.effect = Effect::Send {
                    destination: send.destination,
                };
            }
            Block::Receive(receive) => {
                if !self.txn.block_exists(&receive.source)? {
                    return Ok(Self::reject(ProcessResult::GapSource, account));
                }
                let key = PendingKey::new(account, receive.source);
                let Some(pending) = self.txn.pending_get(&key)? else {
                    return Ok(Self::reject(ProcessResult::Unreceivable, account));
                };
                if pending.epoch != Epoch::Epoch0 {
                    return Ok(Self::reject(ProcessResult::Unreceivable, account));
                }
                if self.dividend_height(&pending.dividend)? > self.dividend_height(&info.dividend)? {
                    return Ok(Self::reject(ProcessResult::IncorrectDividend, account));
                }
                let Some(balance) = info.balance.checked_add(pending.amount) else {
                    return Ok(Self::reject(ProcessResult::BalanceMismatch, account));
                };
                transition.balance = balance;
                transition.amount = pending.amount;
                transition.effect = Effect::Receive {
                    source: receive.source,
                };
            }
            Block::Change(change) => {
                transition.representative = change.representative;
                transition.sets_representative = true;
            }
            Block::Open(_) | Block::State(_) | Block::Dividend(_) | Block::Claim(_) => {
                return Err(LedgerError::Inconsistent(format!(
                    "block {hash} routed to legacy validation"
                )));
            }
        }
        Ok(Ok(transition))
    }

    /// Resolves the account state a state-era block builds on. Gaps are
    /// rejected here; a fork is only flagged, so the caller can check the
    /// signature before reporting it.
    fn resolve_state_previous(
        &self,
        account: &Account,
        previous: &BlockHash,
    ) -> Result<Result<StatePrevious, ProcessResult>, LedgerError> {
        let info = self.txn.account_get(account)?;
        if previous.is_zero() {
            let forked = info.is_some();
            return Ok(Ok(StatePrevious { info, forked }));
        }
        if !self.txn.block_exists(previous)? {
            return Ok(Err(ProcessResult::GapPrevious));
        }
        Ok(match info {
            None => Err(ProcessResult::GapPrevious),
            Some(info) => {
                let forked = info.head != *previous;
                Ok(StatePrevious {
                    info: Some(info),
                    forked,
                })
            }
        })
    }

    fn state(
        &mut self,
        block: &Block,
        b: &StateBlock,
    ) -> Result<Result<Transition, ProcessReturn>, LedgerError> {
        let account = b.account;
        let resolved = self.resolve_state_previous(&account, &b.previous)?;
        let StatePrevious { info, forked } = match resolved {
            Ok(resolved) => resolved,
            Err(code) => return Ok(Self::reject(code, account)),
        };
        if info.is_none() && account == Account::BURN {
            return Ok(Self::reject(ProcessResult::OpenedBurnAccount, account));
        }

        let is_epoch = self.ledger.is_epoch_link(&b.link);
        let next_epoch = match &info {
            Some(info) if is_epoch => match info.epoch.successor() {
                Some(next) => Some(next),
                None => return Ok(Self::reject(ProcessResult::BlockPosition, account)),
            },
            None if is_epoch => return Ok(Self::reject(ProcessResult::BlockPosition, account)),
            _ => None,
        };

        let signer = if is_epoch {
            self.ledger.epoch_signer()
        } else {
            account
        };
        if !self.check_signature(block, &signer, is_epoch) {
            return Ok(Self::reject(ProcessResult::BadSignature, account));
        }
        if forked {
            return Ok(Self::reject(ProcessResult::Fork, account));
        }

        let previous_balance = info.as_ref().map(|i| i.balance).unwrap_or_default();
        let previous_rep = match &info {
            Some(info) => self.head_representative(info)?,
            None => Account::ZERO,
        };
        let pointer = info.as_ref().map(|i| i.dividend).unwrap_or_default();
        let mut transition = Transition {
            account,
            previous: info.clone(),
            previous_rep,
            balance: b.balance,
            representative: b.representative,
            sets_representative: true,
            dividend: pointer,
            epoch: info.as_ref().map(|i| i.epoch).unwrap_or_default(),
            amount: Amount::ZERO,
            effect: Effect::None,
        };

        if let Some(next) = next_epoch {
            if b.balance != previous_balance {
                return Ok(Self::reject(ProcessResult::BalanceMismatch, account));
            }
            if b.representative != previous_rep {
                return Ok(Self::reject(ProcessResult::RepresentativeMismatch, account));
            }
            if b.dividend != pointer {
                return Ok(Self::reject(ProcessResult::IncorrectDividend, account));
            }
            transition.epoch = next;
            return Ok(Ok(transition));
        }

        if b.balance < previous_balance {
            if b.dividend != pointer {
                return Ok(Self::reject(ProcessResult::IncorrectDividend, account));
            }
            transition.amount = previous_balance - b.balance;
            transition.effect = Effect::Send {
                destination: b.link.as_account(),
            };
        } else if b.balance > previous_balance || info.is_none() {
            if b.link.is_zero() {
                return Ok(Self::reject(ProcessResult::GapSource, account));
            }
            let source = b.link.as_block_hash();
            if !self.txn.block_exists(&source)? {
                return Ok(Self::reject(ProcessResult::GapSource, account));
            }
            let Some(pending) = self.txn.pending_get(&PendingKey::new(account, source))? else {
                return Ok(Self::reject(ProcessResult::Unreceivable, account));
            };
            let Some(expected) = previous_balance.checked_add(pending.amount) else {
                return Ok(Self::reject(ProcessResult::BalanceMismatch, account));
            };
            if b.balance != expected {
                return Ok(Self::reject(ProcessResult::BalanceMismatch, account));
            }
            if info.is_none() {
                // A new account starts at the dividend the funds were sent under.
                if b.dividend != pending.dividend {
                    return Ok(Self::reject(ProcessResult::IncorrectDividend, account));
                }
                transition.dividend = pending.dividend;
            } else if b.dividend != pointer
                || self.dividend_height(&pending.dividend)? > self.dividend_height(&pointer)?
            {
                return Ok(Self::reject(ProcessResult::IncorrectDividend, account));
            }
            transition.epoch = transition.epoch.max(pending.epoch);
            transition.amount = pending.amount;
            transition.effect = Effect::Receive { source };
        } else {
            if !b.link.is_zero() {
                return Ok(Self::reject(ProcessResult::BalanceMismatch, account));
            }
            if b.dividend != pointer {
                return Ok(Self::reject(ProcessResult::IncorrectDividend, account));
            }
        }
        Ok(Ok(transition))
    }

    fn dividend(
        &mut self,
        block: &Block,
        b: &DividendBlock,
        hash: &BlockHash,
    ) -> Result<Result<Transition, ProcessReturn>, LedgerError> {
        let account = b.account;
        let (info, forked) = match self.resolve_state_previous(&account, &b.previous)? {
            Ok(StatePrevious {
                info: Some(info),
                forked,
            }) => (info, forked),
            Ok(StatePrevious { info: None, .. }) => {
                return Ok(Self::reject(ProcessResult::BlockPosition, account))
            }
            Err(code) => return Ok(Self::reject(code, account)),
        };
        if !self.check_signature(block, &account, false) {
            return Ok(Self::reject(ProcessResult::BadSignature, account));
        }
        if forked {
            return Ok(Self::reject(ProcessResult::Fork, account));
        }
        let params = self.ledger.params();
        if account != params.dividend_account {
            return Ok(Self::reject(ProcessResult::InvalidDividendAccount, account));
        }
        let latest = self.txn.latest_dividend_get()?;
        if b.dividend != latest {
            return Ok(Self::reject(ProcessResult::DividendFork, account));
        }
        if self.txn.pending_any(&account)? {
            return Ok(Self::reject(ProcessResult::OutstandingPendings, account));
        }
        if b.balance >= info.balance {
            return Ok(Self::reject(ProcessResult::NegativeSpend, account));
        }
        let amount = info.balance - b.balance;
        if amount < params.minimum_dividend {
            return Ok(Self::reject(ProcessResult::DividendTooSmall, account));
        }
        let dividend_info = DividendInfo {
            account,
            amount,
            eligible_supply: params.genesis_amount.saturating_sub(info.balance),
            height: self.dividend_height(&latest)? + 1,
            previous: latest,
            claimed: Amount::ZERO,
        };
        let previous_rep = self.head_representative(&info)?;
        Ok(Ok(Transition {
            account,
            previous_rep,
            balance: b.balance,
            representative: b.representative,
            sets_representative: true,
            // The issuer accounts for its own dividend when issuing it.
            dividend: *hash,
            epoch: info.epoch,
            amount,
            effect: Effect::Dividend { info: dividend_info },
            previous: Some(info),
        }))
    }

    fn claim(
        &mut self,
        block: &Block,
        b: &ClaimBlock,
    ) -> Result<Result<Transition, ProcessReturn>, LedgerError> {
        let account = b.account;
        let (info, forked) = match self.resolve_state_previous(&account, &b.previous)? {
            Ok(StatePrevious {
                info: Some(info),
                forked,
            }) => (info, forked),
            Ok(StatePrevious { info: None, .. }) => {
                return Ok(Self::reject(ProcessResult::BlockPosition, account))
            }
            Err(code) => return Ok(Self::reject(code, account)),
        };
        if !self.check_signature(block, &account, false) {
            return Ok(Self::reject(ProcessResult::BadSignature, account));
        }
        if forked {
            return Ok(Self::reject(ProcessResult::Fork, account));
        }
        if account == self.ledger.params().dividend_account {
            return Ok(Self::reject(ProcessResult::InvalidDividendAccount, account));
        }
        let Some(dividend) = self.txn.dividend_get(&b.dividend)? else {
            return Ok(Self::reject(ProcessResult::GapSource, account));
        };
        if dividend.previous != info.dividend {
            return Ok(Self::reject(ProcessResult::IncorrectDividend, account));
        }
        if self
            .ledger
            .has_pending_before(self.txn.as_read(), &account, dividend.height)?
        {
            return Ok(Self::reject(ProcessResult::OutstandingPendings, account));
        }
        let Some(share) = claim_share(info.balance, &dividend) else {
            return Ok(Self::reject(ProcessResult::BalanceMismatch, account));
        };
        if info.balance.checked_add(share) != Some(b.balance) {
            return Ok(Self::reject(ProcessResult::BalanceMismatch, account));
        }
        let previous_rep = self.head_representative(&info)?;
        Ok(Ok(Transition {
            account,
            previous_rep,
            balance: b.balance,
            representative: b.representative,
            sets_representative: true,
            dividend: b.dividend,
            epoch: info.epoch,
            amount: share,
            effect: Effect::Claim {
                dividend: b.dividend,
                share,
            },
            previous: Some(info),
        }))
    }

    /// Write every side effect of a validated block.
    fn commit(&mut self, block: &Block, hash: &BlockHash, t: Transition) -> Result<(), LedgerError> {
        let now = Timestamp::now();
        let previous_hash = block.previous();
        let (height, open_block, prev_rep_block) = match &t.previous {
            Some(info) => (info.block_count + 1, info.open_block, info.rep_block),
            None => (1, *hash, BlockHash::ZERO),
        };
        let rep_block = if t.sets_representative { *hash } else { prev_rep_block };

        let stored = StoredBlock {
            block: block.clone(),
            sideband: BlockSideband {
                account: t.account,
                height,
                balance: t.balance,
                representative: t.representative,
                rep_block,
                dividend: t.dividend,
                epoch: t.epoch,
                timestamp: now,
            },
        };
        self.txn.block_put(hash, &stored)?;
        if !previous_hash.is_zero() {
            self.txn.block_successor_set(&previous_hash, hash)?;
        }

        if let Some(info) = &t.previous {
            self.ledger.weight_sub(&mut *self.txn, &t.previous_rep, info.balance)?;
        }
        self.ledger.weight_add(&mut *self.txn, &t.representative, t.balance)?;

        match &t.effect {
            Effect::None => {}
            Effect::Send { destination } => {
                let pending = PendingInfo {
                    source: t.account,
                    amount: t.amount,
                    epoch: t.epoch,
                    dividend: t.dividend,
                };
                self.txn
                    .pending_put(&PendingKey::new(*destination, *hash), &pending)?;
            }
            Effect::Receive { source } => {
                self.txn.pending_del(&PendingKey::new(t.account, *source))?;
            }
            Effect::Dividend { info } => {
                self.txn.dividend_put(hash, info)?;
                self.txn.latest_dividend_put(hash)?;
            }
            Effect::Claim { dividend, share } => {
                let mut info = self
                    .txn
                    .dividend_get(dividend)?
                    .ok_or_else(|| LedgerError::Inconsistent(format!("dividend {dividend} vanished")))?;
                info.claimed = info.claimed.saturating_add(*share);
                self.txn.dividend_put(dividend, &info)?;
                self.txn.dividend_claim_put(dividend, hash, &t.account)?;
            }
        }
        self.txn.account_put(
            &t.account,
            &AccountInfo {
                head: *hash,
                open_block,
                rep_block,
                balance: t.balance,
                dividend: t.dividend,
                modified: now,
                block_count: height,
                epoch: t.epoch,
            },
        )?;

        if !previous_hash.is_zero() {
            let previous_is_legacy = self
                .txn
                .block_get::<StoredBlock>(&previous_hash)?
                .map(|s| !s.block.is_state_era())
                .unwrap_or(false);
            if previous_is_legacy {
                self.txn.frontier_del(&previous_hash)?;
            }
            self.ledger.checksum_toggle(&mut *self.txn, &previous_hash)?;
        }
        if !block.is_state_era() {
            self.txn.frontier_put(hash, &t.account)?;
        }
        self.ledger.checksum_toggle(&mut *self.txn, hash)?;
        self.ledger.block_count_add(1);
        Ok(())
    }
}
