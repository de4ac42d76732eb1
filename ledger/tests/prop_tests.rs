mod common;

use common::*;
use lattice_ledger::{ProcessResult, GENESIS_AMOUNT};
use lattice_types::{Account, Amount};
use proptest::prelude::*;

#[derive(Clone, Debug)]
struct Step {
    from: usize,
    to: usize,
    amount: u128,
    receive: bool,
}

fn step() -> impl Strategy<Value = Step> {
    (0usize..4, 0usize..4, 1u128..1_000, any::<bool>()).prop_map(|(from, to, amount, receive)| Step {
        from,
        to,
        amount,
        receive,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn supply_is_conserved_and_rollback_restores_genesis(steps in prop::collection::vec(step(), 1..12)) {
        let ledger = ledger();
        let keys = [genesis(), key(2), key(3), key(4)];
        let genesis_hash = ledger.params().genesis_hash();
        let mut first_send = None;

        for s in steps {
            let from = &keys[s.from];
            let to = &keys[s.to];
            let Some(current) = info(&ledger, &from.account) else { continue };
            if current.balance < Amount::raw(s.amount) || s.from == s.to {
                continue;
            }
            let block = send(&ledger, from, &to.account, s.amount);
            prop_assert_eq!(process(&ledger, &block).code, ProcessResult::Progress);
            if s.from == 0 && first_send.is_none() {
                first_send = Some(block.hash());
            }
            if s.receive {
                let r = receive(&ledger, to, &block);
                prop_assert_eq!(process(&ledger, &r).code, ProcessResult::Progress);
            }
            prop_assert_eq!(supply(&ledger), GENESIS_AMOUNT);
        }

        if let Some(hash) = first_send {
            rollback(&ledger, &hash);
            prop_assert_eq!(ledger.block_count(), 1);
            prop_assert_eq!(balance(&ledger, &keys[0].account), GENESIS_AMOUNT);
            prop_assert_eq!(ledger.weight(&keys[0].account), GENESIS_AMOUNT);
            read(&ledger, |txn| {
                let checksum = ledger
                    .checksum(txn, &Account::ZERO, &Account::new([0xFF; 32]))
                    .unwrap();
                assert_eq!(checksum, genesis_hash);
            });
        }
        prop_assert_eq!(supply(&ledger), GENESIS_AMOUNT);
    }
}
