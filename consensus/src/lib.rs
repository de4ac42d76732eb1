//! Consensus: fork resolution by representative voting.
//!
//! Every account delegates its balance to a representative. When two blocks
//! compete for the same root, an [`Election`] collects signed [`Vote`]s and
//! confirms the block whose weight leads the runner-up by the quorum delta,
//! measured against the stake of representatives currently online.
//!
//! ## Module overview
//!
//! - [`vote`]: signed votes and batch verification.
//! - [`election`]: per-root election state machine and tallying.
//! - [`history`]: bounded log of finished elections.
//! - [`online_reps`]: representatives heard from recently and online stake.
//! - [`gap_cache`]: missing blocks and the weight voting for them.
//! - [`rep_crawler`]: which peers speak for which representatives.
//! - [`block_arrival`]: recently arrived blocks.
//! - [`weights`]: representative weight lookup.

pub mod block_arrival;
pub mod election;
pub mod error;
pub mod gap_cache;
pub mod history;
pub mod online_reps;
pub mod rep_crawler;
pub mod vote;
pub mod weights;

pub use block_arrival::BlockArrival;
pub use election::{
    vote_cooldown, Election, ElectionState, ElectionStatus, Quorum, QuorumOutcome, VoteInfo, VoteOutcome,
    MAX_BLOCKS,
};
pub use error::ConsensusError;
pub use gap_cache::{bootstrap_threshold, GapCache};
pub use history::ConfirmationHistory;
pub use online_reps::OnlineReps;
pub use rep_crawler::{RepCrawler, RepresentativePeer};
pub use vote::{validate_batch, Vote, VoteEntry, MAX_VOTE_ENTRIES};
pub use weights::WeightSource;
