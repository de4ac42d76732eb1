//! 256-bit value types: accounts, block hashes, roots and links.
//!
//! All four share the same representation but are distinct types so that a
//! block hash can never be passed where an account is expected. Conversions
//! between them are explicit.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! u256_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            /// Parse from a 64-character hex string.
            pub fn decode_hex(s: &str) -> Result<Self, TypesError> {
                let bytes = hex::decode(s).map_err(|e| TypesError::InvalidHex(e.to_string()))?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|v: Vec<u8>| TypesError::InvalidLength { expected: 32, actual: v.len() })?;
                Ok(Self(arr))
            }

            pub fn encode_hex(&self) -> String {
                hex::encode_upper(self.0)
            }

            /// Build a value whose last eight bytes hold `n` big-endian.
            /// Handy for constructing distinct values in tests.
            pub fn from_u64(n: u64) -> Self {
                let mut bytes = [0u8; 32];
                bytes[24..].copy_from_slice(&n.to_be_bytes());
                Self(bytes)
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode_upper(&self.0[..4]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode_upper(self.0))
            }
        }
    };
}

u256_type!(
    /// A 32-byte Ed25519 public key identifying an account chain.
    ///
    /// The zero account is the burn account: funds sent to it can never be received.
    Account
);

u256_type!(
    /// A 32-byte Blake2b block hash.
    BlockHash
);

u256_type!(
    /// The slot a block occupies: its previous hash, or the account key for the
    /// first block of a chain. Elections are keyed by root.
    Root
);

u256_type!(
    /// Dual-purpose state block field: destination account for sends, source
    /// hash for receives, zero for representative changes, or the epoch
    /// sentinel for epoch upgrades.
    Link
);

impl Account {
    /// The burn account. Sending to it destroys funds; opening it is rejected.
    pub const BURN: Self = Self::ZERO;
}

impl From<BlockHash> for Root {
    fn from(hash: BlockHash) -> Self {
        Self(hash.0)
    }
}

impl From<Account> for Root {
    fn from(account: Account) -> Self {
        Self(account.0)
    }
}

impl From<Account> for Link {
    fn from(account: Account) -> Self {
        Self(account.0)
    }
}

impl From<BlockHash> for Link {
    fn from(hash: BlockHash) -> Self {
        Self(hash.0)
    }
}

impl Root {
    pub fn as_block_hash(&self) -> BlockHash {
        BlockHash(self.0)
    }

    pub fn as_account(&self) -> Account {
        Account(self.0)
    }
}

impl Link {
    pub fn as_block_hash(&self) -> BlockHash {
        BlockHash(self.0)
    }

    pub fn as_account(&self) -> Account {
        Account(self.0)
    }
}

impl BlockHash {
    /// XOR another hash into this one. Used for the ledger checksum.
    pub fn xor_assign(&mut self, other: &BlockHash) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a ^= b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let hash = BlockHash::new([0xAB; 32]);
        let decoded = BlockHash::decode_hex(&hash.encode_hex()).unwrap();
        assert_eq!(decoded, hash);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert!(matches!(
            Account::decode_hex("ABCD"),
            Err(TypesError::InvalidLength { expected: 32, actual: 2 })
        ));
    }

    #[test]
    fn decode_rejects_non_hex() {
        assert!(Account::decode_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn burn_account_is_zero() {
        assert!(Account::BURN.is_zero());
        assert!(!Account::from_u64(1).is_zero());
    }

    #[test]
    fn root_conversions_preserve_bytes() {
        let account = Account::from_u64(7);
        let root: Root = account.into();
        assert_eq!(root.as_account(), account);
        let hash = BlockHash::from_u64(9);
        let link: Link = hash.into();
        assert_eq!(link.as_block_hash(), hash);
    }

    #[test]
    fn xor_is_self_inverse() {
        let mut acc = BlockHash::ZERO;
        let a = BlockHash::new([0x0F; 32]);
        let b = BlockHash::new([0xF1; 32]);
        acc.xor_assign(&a);
        acc.xor_assign(&b);
        acc.xor_assign(&a);
        assert_eq!(acc, b);
    }

    #[test]
    fn ordering_is_bytewise() {
        assert!(BlockHash::from_u64(1) < BlockHash::from_u64(2));
        assert!(Account::from_u64(u64::MAX) < Account::new([0xFF; 32]));
    }

    #[test]
    fn debug_is_abbreviated() {
        let hash = BlockHash::new([0x12; 32]);
        assert_eq!(format!("{:?}", hash), "BlockHash(12121212)");
    }
}
