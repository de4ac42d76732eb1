#![allow(dead_code)]

use std::sync::Arc;

use lattice_crypto::keypair_from_seed;
use lattice_ledger::{
    dev_genesis_key, Block, ClaimBlock, DividendBlock, Ledger, NetworkParams, ProcessResult,
    ProcessReturn, StateBlock,
};
use lattice_nullables::NullStore;
use lattice_store::{AccountInfo, Transaction};
use lattice_types::{Account, Amount, BlockHash, KeyPair, Link, Signature};

pub fn ledger() -> Ledger {
    ledger_with(NetworkParams::dev())
}

pub fn ledger_with(params: NetworkParams) -> Ledger {
    Ledger::new(Arc::new(NullStore::new()), params).unwrap()
}

pub fn genesis() -> KeyPair {
    dev_genesis_key()
}

pub fn key(seed: u8) -> KeyPair {
    keypair_from_seed(&[seed; 32])
}

pub fn process(ledger: &Ledger, block: &Block) -> ProcessReturn {
    let mut txn = ledger.store().tx_begin_write().unwrap();
    let result = ledger.process(txn.as_mut(), block).unwrap();
    txn.commit().unwrap();
    result
}

pub fn process_ok(ledger: &Ledger, block: &Block) {
    assert_eq!(process(ledger, block).code, ProcessResult::Progress);
}

pub fn rollback(ledger: &Ledger, hash: &BlockHash) -> Vec<Block> {
    let mut txn = ledger.store().tx_begin_write().unwrap();
    let removed = ledger.rollback(txn.as_mut(), hash).unwrap();
    txn.commit().unwrap();
    removed
}

pub fn read<R>(ledger: &Ledger, f: impl FnOnce(&dyn Transaction) -> R) -> R {
    let txn = ledger.store().tx_begin_read().unwrap();
    f(&*txn)
}

pub fn info(ledger: &Ledger, account: &Account) -> Option<AccountInfo> {
    read(ledger, |txn| ledger.account_info(txn, account).unwrap())
}

pub fn balance(ledger: &Ledger, account: &Account) -> Amount {
    read(ledger, |txn| ledger.account_balance(txn, account).unwrap())
}

pub fn supply(ledger: &Ledger) -> Amount {
    read(ledger, |txn| ledger.conserved_supply(txn).unwrap())
}

pub fn state(
    key: &KeyPair,
    previous: BlockHash,
    representative: Account,
    balance: Amount,
    link: Link,
    dividend: BlockHash,
) -> Block {
    let mut block = Block::State(StateBlock {
        account: key.account,
        previous,
        representative,
        balance,
        link,
        dividend,
        signature: Signature::default(),
        work: 0,
    });
    block.sign(&key.private);
    block
}

/// State send of `amount` from the current head of `from`.
pub fn send(ledger: &Ledger, from: &KeyPair, to: &Account, amount: u128) -> Block {
    let current = info(ledger, &from.account).expect("sender is open");
    let rep = read(ledger, |txn| ledger.representative(txn, &current.head).unwrap().unwrap());
    state(
        from,
        current.head,
        rep,
        current.balance - Amount::raw(amount),
        Link::from(*to),
        current.dividend,
    )
}

/// State receive (or open) of `source` into `to`.
pub fn receive(ledger: &Ledger, to: &KeyPair, source: &Block) -> Block {
    let hash = source.hash();
    let amount = read(ledger, |txn| ledger.amount(txn, &hash).unwrap().unwrap());
    match info(ledger, &to.account) {
        Some(current) => {
            let rep = read(ledger, |txn| ledger.representative(txn, &current.head).unwrap().unwrap());
            state(
                to,
                current.head,
                rep,
                current.balance + amount,
                Link::from(hash),
                current.dividend,
            )
        }
        None => {
            let tag = read(ledger, |txn| {
                ledger
                    .get_stored(txn, &hash)
                    .unwrap()
                    .map(|s| s.sideband.dividend)
                    .unwrap_or_default()
            });
            state(to, BlockHash::ZERO, to.account, amount, Link::from(hash), tag)
        }
    }
}

/// Send from `from` to `to` and receive it on the other side.
pub fn transfer(ledger: &Ledger, from: &KeyPair, to: &KeyPair, amount: u128) -> (Block, Block) {
    let s = send(ledger, from, &to.account, amount);
    process_ok(ledger, &s);
    let r = receive(ledger, to, &s);
    process_ok(ledger, &r);
    (s, r)
}

pub fn dividend(ledger: &Ledger, issuer: &KeyPair, amount: u128) -> Block {
    let current = info(ledger, &issuer.account).expect("issuer is open");
    let latest = read(ledger, |txn| ledger.latest_dividend(txn).unwrap());
    let mut block = Block::Dividend(DividendBlock {
        account: issuer.account,
        previous: current.head,
        representative: issuer.account,
        balance: current.balance - Amount::raw(amount),
        dividend: latest,
        signature: Signature::default(),
        work: 0,
    });
    block.sign(&issuer.private);
    block
}

pub fn claim(ledger: &Ledger, claimant: &KeyPair, dividend: &BlockHash, share: Amount) -> Block {
    let current = info(ledger, &claimant.account).expect("claimant is open");
    let rep = read(ledger, |txn| ledger.representative(txn, &current.head).unwrap().unwrap());
    let mut block = Block::Claim(ClaimBlock {
        account: claimant.account,
        previous: current.head,
        representative: rep,
        balance: current.balance + share,
        dividend: *dividend,
        signature: Signature::default(),
        work: 0,
    });
    block.sign(&claimant.private);
    block
}
