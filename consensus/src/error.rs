use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("a vote must name at least one block")]
    EmptyVote,

    #[error("a vote may name at most 12 blocks, got {0}")]
    TooManyEntries(usize),
}
