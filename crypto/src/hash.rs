//! Blake2b hashing.

use blake2::digest::consts::{U32, U8};
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;
type Blake2b64 = Blake2b<U8>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[data])
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// 64-bit Blake2b digest read little-endian. Used for proof-of-work values.
pub fn blake2b_64_multi(parts: &[&[u8]]) -> u64 {
    let mut hasher = Blake2b64::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 8];
    output.copy_from_slice(&result);
    u64::from_le_bytes(output)
}
