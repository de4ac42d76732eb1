//! Cryptographic primitives for the lattice node.
//!
//! - **Ed25519** for signing blocks and votes, with batch verification
//! - **Blake2b** for block hashes, vote digests and proof-of-work values
//! - Account address encoding with the `lat_` prefix and base32 alphabet

pub mod address;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::{decode_account, encode_account, validate_address};
pub use hash::{blake2b_256, blake2b_256_multi, blake2b_64_multi};
pub use keys::{account_from_private, generate_keypair, keypair_from_private, keypair_from_seed};
pub use sign::{sign_message, verify_batch, verify_signature};
