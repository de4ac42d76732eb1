//! Fundamental types for the lattice node.
//!
//! This crate defines the primitives shared across every other crate in the workspace:
//! account keys, block hashes, roots and links, amounts, signatures, epochs, network
//! identifiers and timestamps. It has no knowledge of blocks or storage.

pub mod amount;
pub mod epoch;
pub mod error;
pub mod keys;
pub mod network;
pub mod time;
pub mod u256;

pub use amount::Amount;
pub use epoch::Epoch;
pub use error::TypesError;
pub use keys::{KeyPair, PrivateKey, Signature};
pub use network::NetworkId;
pub use time::Timestamp;
pub use u256::{Account, BlockHash, Link, Root};
