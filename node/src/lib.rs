//! Lattice node core.
//!
//! The node turns blocks and votes arriving from many threads into ordered
//! ledger mutations and election outcomes:
//! - [`BlockProcessor`] applies blocks in batches under one write transaction,
//!   parks blocks with missing dependencies and forces election winners in
//! - [`ActiveTransactions`] runs one election per contested root and
//!   announces them until they settle
//! - [`VoteProcessor`] verifies and applies representative votes
//! - [`VoteGenerator`] votes with the wallet's representatives
//! - [`Node`] owns all of it, plus the [`Network`] and [`Wallets`] it talks to

pub mod active_transactions;
pub mod block_processor;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod network;
pub mod node;
pub mod node_event;
pub mod shutdown;
pub mod vote_generator;
pub mod vote_processor;
pub mod wallets;

pub use active_transactions::{
    announce_interval, ActiveTransactions, AnnouncePass, ConfirmationCallback, ElectionActions, VoteResult,
};
pub use block_processor::{unchecked_cleanup, unchecked_count, BlockProcessor, UncheckedInfo, BLOCK_PROCESSOR_FULL};
pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use network::{Network, NetworkMessage, NullNetwork};
pub use node::Node;
pub use node_event::{EventBus, NodeEvent};
pub use shutdown::ShutdownController;
pub use vote_generator::VoteGenerator;
pub use vote_processor::{admit, max_vote, VoteCode, VoteProcessor};
pub use wallets::{NullWallets, Wallets};
