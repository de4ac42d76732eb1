#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use lattice_crypto::keypair_from_seed;
use lattice_ledger::{dev_genesis_key, Block, DividendBlock, NetworkParams, ProcessResult, StateBlock};
use lattice_node::{Node, NodeConfig, NullNetwork, NullWallets};
use lattice_nullables::NullStore;
use lattice_store::{AccountInfo, Transaction};
use lattice_types::{Account, Amount, BlockHash, KeyPair, Link, Signature};
use lattice_work::WorkThresholds;

pub struct TestNode {
    pub node: Arc<Node>,
    pub network: Arc<NullNetwork>,
    pub wallets: Arc<NullWallets>,
}

impl Drop for TestNode {
    fn drop(&mut self) {
        self.node.stop();
    }
}

/// Dev parameters with work checks disabled.
pub fn params() -> NetworkParams {
    let mut params = NetworkParams::dev();
    params.work = WorkThresholds::with_publish(0);
    params
}

pub fn config() -> NodeConfig {
    NodeConfig {
        io_threads: 2,
        ..NodeConfig::default()
    }
}

pub fn build(config: NodeConfig, params: NetworkParams, wallets: NullWallets) -> TestNode {
    let network = Arc::new(NullNetwork::with_peers(vec![
        "10.0.0.1:7075".parse().unwrap(),
        "10.0.0.2:7075".parse().unwrap(),
    ]));
    let wallets = Arc::new(wallets);
    let node = Node::new(
        config,
        params,
        Arc::new(NullStore::new()),
        network.clone(),
        wallets.clone(),
    )
    .unwrap();
    TestNode { node, network, wallets }
}

/// A started dev node with no local keys.
pub fn started() -> TestNode {
    started_with(NullWallets::new())
}

pub fn started_with(wallets: NullWallets) -> TestNode {
    let test = build(config(), params(), wallets);
    test.node.start().unwrap();
    test
}

pub fn genesis() -> KeyPair {
    dev_genesis_key()
}

pub fn key(seed: u8) -> KeyPair {
    keypair_from_seed(&[seed; 32])
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn assert_timely(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within {timeout:?}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

pub fn read<R>(node: &Node, f: impl FnOnce(&dyn Transaction) -> R) -> R {
    let txn = node.store.tx_begin_read().unwrap();
    f(&*txn)
}

pub fn info(node: &Node, account: &Account) -> Option<AccountInfo> {
    read(node, |txn| node.ledger.account_info(txn, account).unwrap())
}

pub fn balance(node: &Node, account: &Account) -> Amount {
    read(node, |txn| node.ledger.account_balance(txn, account).unwrap())
}

pub fn exists(node: &Node, hash: &BlockHash) -> bool {
    read(node, |txn| node.ledger.block_exists(txn, hash).unwrap())
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

/// Send of `amount` from `from`'s current head.
pub fn send(node: &Node, from: &KeyPair, to: &Account, amount: u128) -> Block {
    let current = info(node, &from.account).expect("sender is open");
    send_from(node, from, current.head, to, current.balance.number() - amount)
}

/// Send from an explicit `previous`, leaving `remaining` on the account.
pub fn send_from(node: &Node, from: &KeyPair, previous: BlockHash, to: &Account, remaining: u128) -> Block {
    let current = info(node, &from.account).expect("sender is open");
    state(
        from,
        previous,
        from.account,
        Amount::raw(remaining),
        Link::from(*to),
        current.dividend,
    )
}

/// Open `to` by receiving `amount` from the send `source`.
pub fn open(node: &Node, to: &KeyPair, source: &Block, amount: u128) -> Block {
    let hash = source.hash();
    let tag = read(node, |txn| {
        node.ledger
            .get_stored(txn, &hash)
            .unwrap()
            .map(|s| s.sideband.dividend)
            .unwrap_or_default()
    });
    state(to, BlockHash::ZERO, to.account, Amount::raw(amount), Link::from(hash), tag)
}

/// Open `to` with `amount` from genesis, applying both blocks directly.
pub fn fund(node: &Node, to: &KeyPair, amount: u128) -> (Block, Block) {
    let s = send(node, &genesis(), &to.account, amount);
    assert_eq!(node.process(&s).unwrap().code, ProcessResult::Progress);
    let o = open(node, to, &s, amount);
    assert_eq!(node.process(&o).unwrap().code, ProcessResult::Progress);
    (s, o)
}

pub fn dividend(node: &Node, issuer: &KeyPair, amount: u128) -> Block {
    let current = info(node, &issuer.account).expect("issuer is open");
    let latest = read(node, |txn| node.ledger.latest_dividend(txn).unwrap());
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
