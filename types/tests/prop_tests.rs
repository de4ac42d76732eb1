use proptest::prelude::*;

use lattice_types::{Account, Amount, BlockHash, Timestamp};

proptest! {
    /// Hex parsing accepts exactly what encoding produces.
    #[test]
    fn account_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let account = Account::new(bytes);
        let decoded = Account::decode_hex(&account.encode_hex()).unwrap();
        prop_assert_eq!(decoded, account);
    }

    /// BlockHash::is_zero is true only for all-zero bytes.
    #[test]
    fn block_hash_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        let hash = BlockHash::new(bytes);
        prop_assert_eq!(hash.is_zero(), bytes == [0u8; 32]);
    }

    /// Checked amount arithmetic agrees with u128 checked arithmetic.
    #[test]
    fn amount_checked_ops_match_u128(a in any::<u128>(), b in any::<u128>()) {
        prop_assert_eq!(
            Amount::raw(a).checked_add(Amount::raw(b)).map(|x| x.number()),
            a.checked_add(b)
        );
        prop_assert_eq!(
            Amount::raw(a).checked_sub(Amount::raw(b)).map(|x| x.number()),
            a.checked_sub(b)
        );
    }

    /// XOR-ing the same hash twice leaves the accumulator unchanged.
    #[test]
    fn xor_twice_is_identity(acc in prop::array::uniform32(0u8..), x in prop::array::uniform32(0u8..)) {
        let mut value = BlockHash::new(acc);
        let other = BlockHash::new(x);
        value.xor_assign(&other);
        value.xor_assign(&other);
        prop_assert_eq!(value, BlockHash::new(acc));
    }

    /// Timestamp ordering follows the underlying seconds.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        prop_assert_eq!(Timestamp::new(a) <= Timestamp::new(b), a <= b);
        prop_assert_eq!(Timestamp::new(a).elapsed_since(Timestamp::new(b)), b.saturating_sub(a));
    }
}
