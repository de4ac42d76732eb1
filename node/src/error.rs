use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] lattice_ledger::LedgerError),

    #[error("consensus error: {0}")]
    Consensus(#[from] lattice_consensus::ConsensusError),

    #[error("store error: {0}")]
    Store(#[from] lattice_store::StoreError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("proof-of-work does not meet minimum difficulty")]
    WorkInvalid,

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("node is stopped")]
    Stopped,
}
