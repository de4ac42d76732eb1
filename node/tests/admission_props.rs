//! Properties of vote queue admission.

use lattice_node::admit;
use lattice_types::Amount;
use proptest::prelude::*;

const QUEUE_LIMIT: usize = 160 * 1024;

proptest! {
    #[test]
    fn shorter_queues_admit_whatever_longer_ones_do(
        queued in 0..QUEUE_LIMIT,
        shorter_by in 0..QUEUE_LIMIT,
        weight in any::<u64>(),
        stake in 1..u64::MAX,
    ) {
        let weight = Amount::raw(weight.into());
        let stake = Amount::raw(stake.into());
        if admit(queued, weight, stake, false) {
            prop_assert!(admit(queued.saturating_sub(shorter_by), weight, stake, false));
        }
    }

    #[test]
    fn heavier_representatives_admit_whatever_lighter_ones_do(
        queued in 0..QUEUE_LIMIT,
        weight in any::<u64>(),
        extra in any::<u64>(),
        stake in 1..u64::MAX,
    ) {
        let stake = Amount::raw(stake.into());
        if admit(queued, Amount::raw(weight.into()), stake, false) {
            let heavier = Amount::raw(u128::from(weight) + u128::from(extra));
            prop_assert!(admit(queued, heavier, stake, false));
        }
    }

    #[test]
    fn dev_network_never_drops(queued in 0..QUEUE_LIMIT, stake in any::<u64>()) {
        prop_assert!(admit(queued, Amount::ZERO, Amount::raw(stake.into()), true));
    }
}
