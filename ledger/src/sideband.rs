//! Per-block metadata stored next to each block.
//!
//! Legacy blocks carry neither their account nor their balance, so the ledger
//! records the resolved chain state after every block. Rollback restores
//! account info from the sideband of the previous block.

use crate::block::Block;
use lattice_types::{Account, Amount, BlockHash, Epoch, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSideband {
    pub account: Account,
    /// Position in the account chain, starting at 1.
    pub height: u64,
    /// Account balance after the block.
    pub balance: Amount,
    /// Representative in effect after the block.
    pub representative: Account,
    /// Latest block that set the representative, up to and including this one.
    pub rep_block: BlockHash,
    /// Dividend pointer after the block.
    pub dividend: BlockHash,
    pub epoch: Epoch,
    pub timestamp: Timestamp,
}

/// The value stored under a block hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlock {
    pub block: Block,
    pub sideband: BlockSideband,
}
