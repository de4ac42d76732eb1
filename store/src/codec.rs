//! Key and value encoding shared by the typed tables.
//!
//! Values are bincode. Keys are raw big-endian bytes so that range scans
//! follow numeric order.

use crate::StoreError;
use lattice_types::{Account, BlockHash};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn encode<V: Serialize + ?Sized>(value: &V) -> Result<Vec<u8>, StoreError> {
    Ok(bincode::serialize(value)?)
}

pub fn decode<V: DeserializeOwned>(bytes: &[u8]) -> Result<V, StoreError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Two 32-byte values concatenated.
pub fn pair_key(a: &[u8; 32], b: &[u8; 32]) -> [u8; 64] {
    let mut key = [0u8; 64];
    key[..32].copy_from_slice(a);
    key[32..].copy_from_slice(b);
    key
}

pub fn split_pair_key(key: &[u8]) -> Result<([u8; 32], [u8; 32]), StoreError> {
    if key.len() != 64 {
        return Err(StoreError::Corruption(format!(
            "expected 64-byte key, found {} bytes",
            key.len()
        )));
    }
    let mut a = [0u8; 32];
    let mut b = [0u8; 32];
    a.copy_from_slice(&key[..32]);
    b.copy_from_slice(&key[32..]);
    Ok((a, b))
}

pub fn account_from_key(key: &[u8]) -> Result<Account, StoreError> {
    bytes32(key).map(Account::new)
}

pub fn hash_from_key(key: &[u8]) -> Result<BlockHash, StoreError> {
    bytes32(key).map(BlockHash::new)
}

fn bytes32(key: &[u8]) -> Result<[u8; 32], StoreError> {
    key.try_into().map_err(|_| {
        StoreError::Corruption(format!("expected 32-byte key, found {} bytes", key.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_splits_back() {
        let key = pair_key(&[1u8; 32], &[2u8; 32]);
        let (a, b) = split_pair_key(&key).unwrap();
        assert_eq!(a, [1u8; 32]);
        assert_eq!(b, [2u8; 32]);
    }

    #[test]
    fn short_keys_are_corruption() {
        assert!(matches!(split_pair_key(&[0u8; 10]), Err(StoreError::Corruption(_))));
        assert!(matches!(account_from_key(&[0u8; 31]), Err(StoreError::Corruption(_))));
    }
}
