//! Block-lattice ledger.
//!
//! Each account owns a chain of blocks. The ledger validates blocks against
//! the current store state and applies them inside a caller-supplied write
//! transaction, maintaining account info, pending receivables, representative
//! weights, frontiers, dividends and a rolling checksum. Rollback is the exact
//! inverse, recursively removing dependent blocks on other chains.

pub mod block;
pub mod dividend;
pub mod error;
pub mod genesis;
pub mod ledger;
mod process;
pub mod process_result;
pub mod rep_weights;
mod rollback;
pub mod sideband;

pub use block::{
    Block, BlockType, ChangeBlock, ClaimBlock, DividendBlock, OpenBlock, ReceiveBlock, SendBlock,
    StateBlock,
};
pub use dividend::claim_share;
pub use error::LedgerError;
pub use genesis::{dev_dividend_key, dev_genesis_key, NetworkParams, GENESIS_AMOUNT};
pub use ledger::Ledger;
pub use process_result::{ProcessResult, ProcessReturn, SignatureVerification};
pub use rep_weights::RepWeights;
pub use sideband::{BlockSideband, StoredBlock};
