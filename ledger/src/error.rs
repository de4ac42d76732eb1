use lattice_store::StoreError;
use lattice_types::BlockHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("block {0} not found")]
    BlockNotFound(BlockHash),

    #[error("ledger is inconsistent: {0}")]
    Inconsistent(String),

    #[error("genesis block {found} does not match the network genesis {expected}")]
    GenesisMismatch { found: BlockHash, expected: BlockHash },
}
