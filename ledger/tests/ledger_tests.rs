mod common;

use common::*;
use lattice_ledger::{
    Block, ChangeBlock, OpenBlock, ProcessResult, ReceiveBlock, SendBlock, GENESIS_AMOUNT,
};
use lattice_store::{FrontierStore, PendingKey, PendingStore};
use lattice_types::{Account, Amount, BlockHash, Epoch, Link, Root, Signature};

fn legacy_send(previous: BlockHash, destination: Account, balance: Amount) -> Block {
    let mut block = Block::Send(SendBlock {
        previous,
        destination,
        balance,
        signature: Signature::default(),
        work: 0,
    });
    block.sign(&genesis().private);
    block
}

fn legacy_open(key: &lattice_types::KeyPair, source: BlockHash, representative: Account) -> Block {
    let mut block = Block::Open(OpenBlock {
        source,
        representative,
        account: key.account,
        signature: Signature::default(),
        work: 0,
    });
    block.sign(&key.private);
    block
}

#[test]
fn genesis_holds_full_supply() {
    let ledger = ledger();
    let g = genesis();
    assert_eq!(balance(&ledger, &g.account), GENESIS_AMOUNT);
    assert_eq!(ledger.weight(&g.account), GENESIS_AMOUNT);
    assert_eq!(ledger.block_count(), 1);
    assert_eq!(supply(&ledger), GENESIS_AMOUNT);
    let genesis_hash = ledger.params().genesis_hash();
    read(&ledger, |txn| {
        assert_eq!(ledger.latest(txn, &g.account).unwrap(), genesis_hash);
        assert_eq!(
            ledger.checksum(txn, &Account::ZERO, &Account::new([0xFF; 32])).unwrap(),
            genesis_hash
        );
    });
}

#[test]
fn reopening_store_keeps_genesis() {
    let store = std::sync::Arc::new(lattice_nullables::NullStore::new());
    let first = lattice_ledger::Ledger::new(store.clone(), lattice_ledger::NetworkParams::dev()).unwrap();
    let count = first.block_count();
    drop(first);
    let second = lattice_ledger::Ledger::new(store, lattice_ledger::NetworkParams::dev()).unwrap();
    assert_eq!(second.block_count(), count);
    assert_eq!(second.weight(&genesis().account), GENESIS_AMOUNT);
}

#[test]
fn legacy_send_then_open() {
    let ledger = ledger();
    let g = genesis();
    let key2 = key(2);
    let genesis_hash = ledger.params().genesis_hash();

    let send = legacy_send(genesis_hash, key2.account, GENESIS_AMOUNT - Amount::raw(50));
    let ret = process(&ledger, &send);
    assert_eq!(ret.code, ProcessResult::Progress);
    assert_eq!(ret.account, g.account);
    assert_eq!(ret.amount, Amount::raw(50));
    assert_eq!(ret.pending_account, key2.account);
    assert_eq!(balance(&ledger, &g.account), GENESIS_AMOUNT - Amount::raw(50));
    read(&ledger, |txn| {
        let pending = txn
            .pending_get(&PendingKey::new(key2.account, send.hash()))
            .unwrap()
            .unwrap();
        assert_eq!(pending.amount, Amount::raw(50));
        assert_eq!(pending.source, g.account);
        assert_eq!(ledger.account_pending(txn, &key2.account).unwrap(), Amount::raw(50));
    });
    assert_eq!(supply(&ledger), GENESIS_AMOUNT);

    let open = legacy_open(&key2, send.hash(), key2.account);
    let ret = process(&ledger, &open);
    assert_eq!(ret.code, ProcessResult::Progress);
    assert_eq!(ret.amount, Amount::raw(50));
    assert_eq!(balance(&ledger, &key2.account), Amount::raw(50));
    assert_eq!(ledger.weight(&key2.account), Amount::raw(50));
    assert_eq!(ledger.weight(&g.account), GENESIS_AMOUNT - Amount::raw(50));
    read(&ledger, |txn| {
        assert!(!ledger.pending_exists(txn, &key2.account, &send.hash()).unwrap());
        assert_eq!(txn.frontier_get(&open.hash()).unwrap(), Some(key2.account));
        assert_eq!(txn.frontier_get(&send.hash()).unwrap(), Some(g.account));
        assert_eq!(txn.frontier_get(&genesis_hash).unwrap(), None);
    });
    assert_eq!(supply(&ledger), GENESIS_AMOUNT);
}

#[test]
fn legacy_receive_and_change() {
    let ledger = ledger();
    let key2 = key(2);
    let genesis_hash = ledger.params().genesis_hash();
    let send1 = legacy_send(genesis_hash, key2.account, GENESIS_AMOUNT - Amount::raw(50));
    let send2 = legacy_send(send1.hash(), key2.account, GENESIS_AMOUNT - Amount::raw(80));
    process_ok(&ledger, &send1);
    process_ok(&ledger, &send2);
    let open = legacy_open(&key2, send1.hash(), key2.account);
    process_ok(&ledger, &open);

    let mut receive = Block::Receive(ReceiveBlock {
        previous: open.hash(),
        source: send2.hash(),
        signature: Signature::default(),
        work: 0,
    });
    receive.sign(&key2.private);
    assert_eq!(process(&ledger, &receive).code, ProcessResult::Progress);
    assert_eq!(balance(&ledger, &key2.account), Amount::raw(80));

    let rep = key(3).account;
    let mut change = Block::Change(ChangeBlock {
        previous: receive.hash(),
        representative: rep,
        signature: Signature::default(),
        work: 0,
    });
    change.sign(&key2.private);
    let ret = process(&ledger, &change);
    assert_eq!(ret.code, ProcessResult::Progress);
    assert_eq!(ret.amount, Amount::ZERO);
    assert_eq!(ledger.weight(&rep), Amount::raw(80));
    assert_eq!(ledger.weight(&key2.account), Amount::ZERO);
    assert_eq!(info(&ledger, &key2.account).unwrap().rep_block, change.hash());
}

#[test]
fn processing_twice_is_old_and_changes_nothing() {
    let ledger = ledger();
    let g = genesis();
    let send = send(&ledger, &g, &key(2).account, 100);
    process_ok(&ledger, &send);
    let before = info(&ledger, &g.account);
    let count = ledger.block_count();
    assert_eq!(process(&ledger, &send).code, ProcessResult::Old);
    assert_eq!(info(&ledger, &g.account), before);
    assert_eq!(ledger.block_count(), count);
}

#[test]
fn abandoned_writes_are_dropped_from_caches_on_reload() {
    let ledger = ledger();
    let g = genesis();
    let send = send(&ledger, &g, &key(2).account, 100);
    {
        let mut txn = ledger.store().tx_begin_write().unwrap();
        assert_eq!(ledger.process(txn.as_mut(), &send).unwrap().code, ProcessResult::Progress);
        assert_eq!(ledger.weight(&g.account), GENESIS_AMOUNT - Amount::raw(100));
    }
    ledger.reload_caches().unwrap();
    assert_eq!(ledger.weight(&g.account), GENESIS_AMOUNT);
    assert_eq!(ledger.block_count(), 1);
    assert_eq!(process(&ledger, &send).code, ProcessResult::Progress);
}

#[test]
fn double_send_is_a_fork_and_only_first_is_kept() {
    let ledger = ledger();
    let g = genesis();
    let first = send(&ledger, &g, &key(2).account, 10);
    let second = send(&ledger, &g, &key(3).account, 20);
    assert_eq!(first.root(), second.root());
    process_ok(&ledger, &first);
    assert_eq!(process(&ledger, &second).code, ProcessResult::Fork);
    read(&ledger, |txn| {
        assert!(ledger.block_exists(txn, &first.hash()).unwrap());
        assert!(!ledger.block_exists(txn, &second.hash()).unwrap());
        let forked = ledger.forked_block(txn, &second).unwrap().unwrap();
        assert_eq!(forked.hash(), first.hash());
    });
}

#[test]
fn unsigned_block_at_an_occupied_slot_is_a_bad_signature() {
    let ledger = ledger();
    let g = genesis();
    let first = send(&ledger, &g, &key(2).account, 10);
    let mut forged = send(&ledger, &g, &key(3).account, 20);
    let mut foreign = send(&ledger, &g, &key(4).account, 30);
    forged.set_signature(Signature::default());
    foreign.sign(&key(9).private);
    process_ok(&ledger, &first);
    assert_eq!(forged.root(), first.root());
    assert_eq!(process(&ledger, &forged).code, ProcessResult::BadSignature);
    assert_eq!(process(&ledger, &foreign).code, ProcessResult::BadSignature);
}

#[test]
fn gaps_are_reported() {
    let ledger = ledger();
    let key2 = key(2);
    let orphan = state(
        &key2,
        BlockHash::from_u64(77),
        key2.account,
        Amount::raw(1),
        Link::ZERO,
        BlockHash::ZERO,
    );
    assert_eq!(process(&ledger, &orphan).code, ProcessResult::GapPrevious);

    let open = state(
        &key2,
        BlockHash::ZERO,
        key2.account,
        Amount::raw(1),
        Link::from(BlockHash::from_u64(78)),
        BlockHash::ZERO,
    );
    assert_eq!(process(&ledger, &open).code, ProcessResult::GapSource);
    assert_eq!(ledger.block_count(), 1);
}

#[test]
fn bad_signature_is_rejected() {
    let ledger = ledger();
    let g = genesis();
    let mut block = send(&ledger, &g, &key(2).account, 10);
    block.sign(&key(9).private);
    assert_eq!(process(&ledger, &block).code, ProcessResult::BadSignature);
}

#[test]
fn send_must_decrease_balance() {
    let ledger = ledger();
    let genesis_hash = ledger.params().genesis_hash();
    let block = legacy_send(genesis_hash, key(2).account, GENESIS_AMOUNT);
    assert_eq!(process(&ledger, &block).code, ProcessResult::NegativeSpend);
}

#[test]
fn send_cannot_be_received_twice() {
    let ledger = ledger();
    let g = genesis();
    let key2 = key(2);
    let (s, _) = transfer(&ledger, &g, &key2, 10);
    let again = receive(&ledger, &key2, &s);
    assert_eq!(process(&ledger, &again).code, ProcessResult::Unreceivable);
}

#[test]
fn burn_account_cannot_be_opened() {
    let ledger = ledger();
    let g = genesis();
    let burn = send(&ledger, &g, &Account::BURN, 10);
    process_ok(&ledger, &burn);
    let mut open = Block::Open(OpenBlock {
        source: burn.hash(),
        representative: Account::BURN,
        account: Account::BURN,
        signature: Signature::default(),
        work: 0,
    });
    open.sign(&key(1).private);
    assert_eq!(process(&ledger, &open).code, ProcessResult::OpenedBurnAccount);
    assert_eq!(supply(&ledger), GENESIS_AMOUNT);
}

#[test]
fn receive_amount_must_match() {
    let ledger = ledger();
    let g = genesis();
    let key2 = key(2);
    let s = send(&ledger, &g, &key2.account, 10);
    process_ok(&ledger, &s);
    let wrong = state(
        &key2,
        BlockHash::ZERO,
        key2.account,
        Amount::raw(11),
        Link::from(s.hash()),
        BlockHash::ZERO,
    );
    assert_eq!(process(&ledger, &wrong).code, ProcessResult::BalanceMismatch);
}

#[test]
fn unchanged_balance_with_link_is_mismatch() {
    let ledger = ledger();
    let g = genesis();
    let current = info(&ledger, &g.account).unwrap();
    let block = state(
        &g,
        current.head,
        g.account,
        current.balance,
        Link::from_u64(5),
        BlockHash::ZERO,
    );
    assert_eq!(process(&ledger, &block).code, ProcessResult::BalanceMismatch);
}

#[test]
fn state_change_moves_weight() {
    let ledger = ledger();
    let g = genesis();
    let rep = key(4).account;
    let current = info(&ledger, &g.account).unwrap();
    let block = state(&g, current.head, rep, current.balance, Link::ZERO, BlockHash::ZERO);
    process_ok(&ledger, &block);
    assert_eq!(ledger.weight(&rep), GENESIS_AMOUNT);
    assert_eq!(ledger.weight(&g.account), Amount::ZERO);
}

#[test]
fn legacy_block_after_state_block_is_misplaced() {
    let ledger = ledger();
    let g = genesis();
    let s = send(&ledger, &g, &key(2).account, 10);
    process_ok(&ledger, &s);
    let legacy = legacy_send(s.hash(), key(2).account, GENESIS_AMOUNT - Amount::raw(20));
    assert_eq!(process(&ledger, &legacy).code, ProcessResult::BlockPosition);
}

#[test]
fn epoch_upgrade_is_sequential_and_signed_by_epoch_signer() {
    let ledger = ledger();
    let g = genesis();
    let key2 = key(2);
    transfer(&ledger, &g, &key2, 10);
    let link = ledger.params().epoch_link;
    let current = info(&ledger, &key2.account).unwrap();

    let mut unsigned = state(&key2, current.head, key2.account, current.balance, link, BlockHash::ZERO);
    assert_eq!(process(&ledger, &unsigned).code, ProcessResult::BadSignature);

    let changed_rep = {
        let mut b = state(&key2, current.head, g.account, current.balance, link, BlockHash::ZERO);
        b.sign(&g.private);
        b
    };
    assert_eq!(process(&ledger, &changed_rep).code, ProcessResult::RepresentativeMismatch);

    unsigned.sign(&g.private);
    let ret = process(&ledger, &unsigned);
    assert_eq!(ret.code, ProcessResult::Progress);
    assert_eq!(info(&ledger, &key2.account).unwrap().epoch, Epoch::Epoch1);
    assert_eq!(ledger.weight(&key2.account), Amount::raw(10));

    let current = info(&ledger, &key2.account).unwrap();
    let mut again = state(&key2, current.head, key2.account, current.balance, link, BlockHash::ZERO);
    again.sign(&g.private);
    assert_eq!(process(&ledger, &again).code, ProcessResult::BlockPosition);

    rollback(&ledger, &unsigned.hash());
    assert_eq!(info(&ledger, &key2.account).unwrap().epoch, Epoch::Epoch0);
}

#[test]
fn rollback_of_received_send_rolls_back_receiver() {
    let ledger = ledger();
    let g = genesis();
    let key2 = key(2);
    let key3 = key(3);
    let (s1, r1) = transfer(&ledger, &g, &key2, 100);
    let (s2, r2) = transfer(&ledger, &key2, &key3, 40);
    let g_before = info(&ledger, &g.account).unwrap();

    let removed = rollback(&ledger, &s1.hash());
    let removed: Vec<_> = removed.iter().map(|b| b.hash()).collect();
    assert_eq!(removed, vec![r2.hash(), s2.hash(), r1.hash(), s1.hash()]);

    assert!(info(&ledger, &key2.account).is_none());
    assert!(info(&ledger, &key3.account).is_none());
    assert_eq!(balance(&ledger, &g.account), GENESIS_AMOUNT);
    assert_eq!(ledger.weight(&g.account), GENESIS_AMOUNT);
    assert_eq!(ledger.weight(&key2.account), Amount::ZERO);
    assert_eq!(ledger.block_count(), 1);
    assert_ne!(info(&ledger, &g.account).unwrap().head, g_before.head);
    read(&ledger, |txn| {
        assert_eq!(txn.pending_count().unwrap(), 0);
        let genesis_hash = ledger.params().genesis_hash();
        assert_eq!(txn.frontier_get(&genesis_hash).unwrap(), Some(g.account));
        assert_eq!(
            ledger.checksum(txn, &Account::ZERO, &Account::new([0xFF; 32])).unwrap(),
            genesis_hash
        );
    });
    assert_eq!(supply(&ledger), GENESIS_AMOUNT);
}

#[test]
fn rollback_of_receive_restores_pending() {
    let ledger = ledger();
    let g = genesis();
    let key2 = key(2);
    let (s, r) = transfer(&ledger, &g, &key2, 100);
    let removed = rollback(&ledger, &r.hash());
    assert_eq!(removed.len(), 1);
    read(&ledger, |txn| {
        let pending = txn
            .pending_get(&PendingKey::new(key2.account, s.hash()))
            .unwrap()
            .unwrap();
        assert_eq!(pending.amount, Amount::raw(100));
        assert_eq!(pending.source, g.account);
    });
    assert_eq!(supply(&ledger), GENESIS_AMOUNT);
    assert_eq!(process(&ledger, &r).code, ProcessResult::Progress);
}

#[test]
fn genesis_cannot_be_rolled_back() {
    let ledger = ledger();
    let genesis_hash = ledger.params().genesis_hash();
    let mut txn = ledger.store().tx_begin_write().unwrap();
    assert!(ledger.rollback(txn.as_mut(), &genesis_hash).is_err());
}

#[test]
fn checksum_tracks_heads() {
    let ledger = ledger();
    let g = genesis();
    let key2 = key(2);
    transfer(&ledger, &g, &key2, 5);
    let g_head = info(&ledger, &g.account).unwrap().head;
    let k_head = info(&ledger, &key2.account).unwrap().head;
    let mut expected = g_head;
    expected.xor_assign(&k_head);
    read(&ledger, |txn| {
        let full = ledger.checksum(txn, &Account::ZERO, &Account::new([0xFF; 32])).unwrap();
        assert_eq!(full, expected);
        let only_key2 = ledger.checksum(txn, &key2.account, &key2.account).unwrap();
        assert_eq!(only_key2, k_head);
    });
}

#[test]
fn could_fit_checks_dependencies() {
    let ledger = ledger();
    let g = genesis();
    let key2 = key(2);
    let s = send(&ledger, &g, &key2.account, 5);
    let open = state(&key2, BlockHash::ZERO, key2.account, Amount::raw(5), Link::from(s.hash()), BlockHash::ZERO);
    read(&ledger, |txn| {
        assert!(ledger.could_fit(txn, &s).unwrap());
        assert!(!ledger.could_fit(txn, &open).unwrap());
    });
    process_ok(&ledger, &s);
    read(&ledger, |txn| assert!(ledger.could_fit(txn, &open).unwrap()));

    // A state send links an account that is no block hash.
    let onward = send(&ledger, &g, &key(3).account, 1);
    let after_onward = state(
        &g,
        onward.hash(),
        g.account,
        Amount::raw(1),
        Link::from(key(4).account),
        BlockHash::ZERO,
    );
    let unknown_dividend = claim(&ledger, &g, &BlockHash::from_u64(5), Amount::raw(1));
    read(&ledger, |txn| {
        assert!(ledger.could_fit(txn, &onward).unwrap());
        assert!(!ledger.could_fit(txn, &after_onward).unwrap());
        assert!(!ledger.could_fit(txn, &unknown_dividend).unwrap());
    });
}

#[test]
fn queries_describe_blocks() {
    let ledger = ledger();
    let g = genesis();
    let key2 = key(2);
    let (s, r) = transfer(&ledger, &g, &key2, 42);
    read(&ledger, |txn| {
        assert_eq!(ledger.amount(txn, &s.hash()).unwrap(), Some(Amount::raw(42)));
        assert_eq!(ledger.amount(txn, &r.hash()).unwrap(), Some(Amount::raw(42)));
        assert_eq!(ledger.block_account(txn, &r.hash()).unwrap(), Some(key2.account));
        assert_eq!(ledger.block_destination(txn, &s).unwrap(), key2.account);
        assert_eq!(ledger.block_source(txn, &r).unwrap(), s.hash());
        assert_eq!(ledger.block_source(txn, &s).unwrap(), BlockHash::ZERO);
        assert_eq!(ledger.representative(txn, &r.hash()).unwrap(), Some(key2.account));
        assert_eq!(ledger.latest_root(txn, &key2.account).unwrap(), Root::from(r.hash()));
        assert_eq!(ledger.latest_root(txn, &key(7).account).unwrap(), Root::from(key(7).account));
        let genesis_hash = ledger.params().genesis_hash();
        assert_eq!(ledger.successor(txn, &Root::from(genesis_hash)).unwrap(), Some(s.clone()));
        assert_eq!(ledger.successor(txn, &Root::from(key2.account)).unwrap(), Some(r.clone()));
        assert!(ledger.is_send(txn, &s).unwrap());
        assert!(!ledger.is_send(txn, &r).unwrap());
    });
}

#[test]
fn bootstrap_weights_apply_while_ledger_is_small() {
    let mut params = lattice_ledger::NetworkParams::dev();
    let rep = key(5).account;
    params.bootstrap_weights.insert(rep, Amount::raw(1_000));
    params.bootstrap_weight_max_blocks = 3;
    let ledger = ledger_with(params);
    let g = genesis();
    assert_eq!(ledger.weight(&rep), Amount::raw(1_000));
    transfer(&ledger, &g, &key(2), 1);
    transfer(&ledger, &g, &key(3), 1);
    assert_eq!(ledger.weight(&rep), Amount::ZERO);
}
