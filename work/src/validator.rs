//! PoW validation.

use lattice_crypto::blake2b_64_multi;
use lattice_types::Root;

/// The difficulty achieved by `work` over `root`.
pub fn work_value(root: &Root, work: u64) -> u64 {
    blake2b_64_multi(&[&work.to_le_bytes(), root.as_bytes()])
}

/// Whether `work` meets `threshold` for `root`.
pub fn work_validate(root: &Root, work: u64, threshold: u64) -> bool {
    work_value(root, work) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threshold_accepts_anything() {
        assert!(work_validate(&Root::from_u64(1), 0, 0));
    }

    #[test]
    fn threshold_is_inclusive() {
        let root = Root::new([0xAA; 32]);
        let value = work_value(&root, 12345);
        assert!(work_validate(&root, 12345, value));
        if value < u64::MAX {
            assert!(!work_validate(&root, 12345, value + 1));
        }
    }

    #[test]
    fn value_depends_on_root() {
        assert_ne!(
            work_value(&Root::from_u64(1), 7),
            work_value(&Root::from_u64(2), 7)
        );
    }
}
