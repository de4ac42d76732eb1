//! Ed25519 key generation.

use ed25519_dalek::SigningKey;
use lattice_types::{Account, KeyPair, PrivateKey};

/// Generate a new key pair from the operating system's random source.
pub fn generate_keypair() -> Result<KeyPair, getrandom::Error> {
    let mut seed = [0u8; 32];
    getrandom::getrandom(&mut seed)?;
    Ok(keypair_from_seed(&seed))
}

/// Derive the account (public key) from a private key.
pub fn account_from_private(private: &PrivateKey) -> Account {
    let signing_key = SigningKey::from_bytes(&private.0);
    Account::new(signing_key.verifying_key().to_bytes())
}

/// Reconstruct a full key pair from a private key.
pub fn keypair_from_private(private: PrivateKey) -> KeyPair {
    let account = account_from_private(&private);
    KeyPair { account, private }
}

/// Derive a key pair from a 32-byte seed (deterministic).
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    keypair_from_private(PrivateKey(*seed))
}
