//! Outcome codes of [`Ledger::process`](crate::Ledger::process).
//!
//! Every code is a value, never an error. Infrastructure failures are
//! reported separately as [`LedgerError`](crate::LedgerError).

use lattice_types::{Account, Amount};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessResult {
    /// Applied.
    Progress,
    /// Already in the ledger.
    Old,
    GapPrevious,
    GapSource,
    BadSignature,
    NegativeSpend,
    Unreceivable,
    Fork,
    OpenedBurnAccount,
    BalanceMismatch,
    RepresentativeMismatch,
    BlockPosition,
    OutstandingPendings,
    DividendTooSmall,
    IncorrectDividend,
    DividendFork,
    InvalidDividendAccount,
}

impl ProcessResult {
    pub const ALL: [ProcessResult; 17] = [
        ProcessResult::Progress,
        ProcessResult::Old,
        ProcessResult::GapPrevious,
        ProcessResult::GapSource,
        ProcessResult::BadSignature,
        ProcessResult::NegativeSpend,
        ProcessResult::Unreceivable,
        ProcessResult::Fork,
        ProcessResult::OpenedBurnAccount,
        ProcessResult::BalanceMismatch,
        ProcessResult::RepresentativeMismatch,
        ProcessResult::BlockPosition,
        ProcessResult::OutstandingPendings,
        ProcessResult::DividendTooSmall,
        ProcessResult::IncorrectDividend,
        ProcessResult::DividendFork,
        ProcessResult::InvalidDividendAccount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessResult::Progress => "progress",
            ProcessResult::Old => "old",
            ProcessResult::GapPrevious => "gap_previous",
            ProcessResult::GapSource => "gap_source",
            ProcessResult::BadSignature => "bad_signature",
            ProcessResult::NegativeSpend => "negative_spend",
            ProcessResult::Unreceivable => "unreceivable",
            ProcessResult::Fork => "fork",
            ProcessResult::OpenedBurnAccount => "opened_burn_account",
            ProcessResult::BalanceMismatch => "balance_mismatch",
            ProcessResult::RepresentativeMismatch => "representative_mismatch",
            ProcessResult::BlockPosition => "block_position",
            ProcessResult::OutstandingPendings => "outstanding_pendings",
            ProcessResult::DividendTooSmall => "dividend_too_small",
            ProcessResult::IncorrectDividend => "incorrect_dividend",
            ProcessResult::DividendFork => "dividend_fork",
            ProcessResult::InvalidDividendAccount => "invalid_dividend_account",
        }
    }

    /// Human readable reason, as reported to RPC callers.
    pub fn reason(&self) -> &'static str {
        match self {
            ProcessResult::Progress => "Block applied",
            ProcessResult::Old => "Old block",
            ProcessResult::GapPrevious => "Gap previous block",
            ProcessResult::GapSource => "Gap source block",
            ProcessResult::BadSignature => "Bad signature",
            ProcessResult::NegativeSpend => "Negative spend",
            ProcessResult::Unreceivable => "Unreceivable",
            ProcessResult::Fork => "Fork",
            ProcessResult::OpenedBurnAccount => "Opened burn account",
            ProcessResult::BalanceMismatch => "Balance and amount delta do not match",
            ProcessResult::RepresentativeMismatch => "Representative mismatch",
            ProcessResult::BlockPosition => "Block position",
            ProcessResult::OutstandingPendings => "Outstanding pending blocks",
            ProcessResult::DividendTooSmall => "Dividend too small",
            ProcessResult::IncorrectDividend => "Incorrect dividend",
            ProcessResult::DividendFork => "Dividend fork",
            ProcessResult::InvalidDividendAccount => "Invalid dividend account",
        }
    }

    /// A missing dependency that may still arrive.
    pub fn is_gap(&self) -> bool {
        matches!(self, ProcessResult::GapPrevious | ProcessResult::GapSource)
    }
}

impl fmt::Display for ProcessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the block signature was already checked before reaching the ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureVerification {
    #[default]
    Unknown,
    /// Valid for the block's account.
    Valid,
    /// Valid for the epoch signer.
    ValidEpoch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessReturn {
    pub code: ProcessResult,
    /// Owner of the processed block, zero when unresolved.
    pub account: Account,
    /// Value moved by the block; zero for non-transfers.
    pub amount: Amount,
    /// Destination of a send, zero otherwise.
    pub pending_account: Account,
    pub verified: SignatureVerification,
}

impl ProcessReturn {
    pub fn new(code: ProcessResult) -> Self {
        Self {
            code,
            account: Account::ZERO,
            amount: Amount::ZERO,
            pending_account: Account::ZERO,
            verified: SignatureVerification::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_have_unique_names() {
        let names: HashSet<_> = ProcessResult::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(names.len(), ProcessResult::ALL.len());
    }

    #[test]
    fn only_gaps_are_gaps() {
        let gaps: Vec<_> = ProcessResult::ALL.iter().filter(|r| r.is_gap()).collect();
        assert_eq!(gaps, vec![&ProcessResult::GapPrevious, &ProcessResult::GapSource]);
    }
}
