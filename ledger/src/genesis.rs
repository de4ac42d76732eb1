//! Per-network parameters and the genesis block.
//!
//! Everything that differs between the live, test and dev networks is
//! collected in [`NetworkParams`] and passed explicitly into the ledger and
//! the node, so independent instances for different networks can coexist in
//! one process.

use std::collections::HashMap;

use crate::block::{Block, OpenBlock};
use lattice_crypto::{blake2b_256, keypair_from_seed};
use lattice_types::{Account, Amount, BlockHash, KeyPair, Link, NetworkId, Signature};
use lattice_work::WorkThresholds;

/// Private key seed of the dev network genesis account. Published so that
/// local networks and tests can spend the genesis balance.
const DEV_GENESIS_SEED: [u8; 32] = [
    0x34, 0xF0, 0xA3, 0x7A, 0xAD, 0x20, 0xF4, 0xA2, 0x60, 0xF0, 0xA5, 0xB3, 0xCB, 0x3D, 0x7F,
    0xB5, 0x06, 0x73, 0x21, 0x22, 0x63, 0xE5, 0x8A, 0x38, 0x0B, 0xC1, 0x04, 0x74, 0xBB, 0x03,
    0x9C, 0xE4,
];

/// Private key seed of the dev network dividend issuer.
const DEV_DIVIDEND_SEED: [u8; 32] = [0xD1; 32];

/// Link value marking a state block as an epoch upgrade.
const EPOCH_LINK_TEXT: &[u8] = b"epoch v1 block";

/// The full supply, held by the genesis account at ledger creation.
pub const GENESIS_AMOUNT: Amount = Amount::MAX;

/// Published key of the dev genesis account.
pub fn dev_genesis_key() -> KeyPair {
    keypair_from_seed(&DEV_GENESIS_SEED)
}

/// Published key of the dev dividend issuer.
pub fn dev_dividend_key() -> KeyPair {
    keypair_from_seed(&DEV_DIVIDEND_SEED)
}

fn epoch_link() -> Link {
    let mut bytes = [0u8; 32];
    bytes[..EPOCH_LINK_TEXT.len()].copy_from_slice(EPOCH_LINK_TEXT);
    Link::new(bytes)
}

/// Well-known account whose private key does not exist.
fn derived_account(label: &str) -> Account {
    Account::new(blake2b_256(label.as_bytes()))
}

#[derive(Clone, Debug)]
pub struct NetworkParams {
    pub network: NetworkId,
    pub genesis_account: Account,
    pub genesis_block: Block,
    pub genesis_amount: Amount,
    /// Signs epoch upgrade blocks on behalf of any account.
    pub epoch_signer: Account,
    pub epoch_link: Link,
    /// The only account allowed to issue dividends.
    pub dividend_account: Account,
    pub minimum_dividend: Amount,
    pub work: WorkThresholds,
    /// Floor for the online stake used in quorum decisions.
    pub online_weight_minimum: Amount,
    /// Percentage of online stake the leading block must lead by.
    pub online_weight_quorum: u8,
    /// Weights used in place of ledger weights while the ledger is small.
    pub bootstrap_weights: HashMap<Account, Amount>,
    pub bootstrap_weight_max_blocks: u64,
}

impl NetworkParams {
    pub fn new(network: NetworkId) -> Self {
        match network {
            NetworkId::Live => Self::unsigned(
                network,
                derived_account("lattice live genesis"),
                derived_account("lattice live dividend"),
                Amount::lat(1_000),
                Amount::lat(60_000_000),
            ),
            NetworkId::Test => Self::unsigned(
                network,
                derived_account("lattice test genesis"),
                derived_account("lattice test dividend"),
                Amount::lat(1),
                Amount::lat(60_000_000),
            ),
            NetworkId::Dev => {
                let genesis = dev_genesis_key();
                let mut genesis_block = genesis_block(genesis.account);
                genesis_block.sign(&genesis.private);
                Self {
                    network,
                    genesis_account: genesis.account,
                    genesis_block,
                    genesis_amount: GENESIS_AMOUNT,
                    epoch_signer: genesis.account,
                    epoch_link: epoch_link(),
                    dividend_account: dev_dividend_key().account,
                    minimum_dividend: Amount::raw(1),
                    work: WorkThresholds::for_network(network),
                    online_weight_minimum: Amount::lat(60_000_000),
                    online_weight_quorum: 50,
                    bootstrap_weights: HashMap::new(),
                    bootstrap_weight_max_blocks: 0,
                }
            }
        }
    }

    pub fn live() -> Self {
        Self::new(NetworkId::Live)
    }

    pub fn dev() -> Self {
        Self::new(NetworkId::Dev)
    }

    fn unsigned(
        network: NetworkId,
        genesis_account: Account,
        dividend_account: Account,
        minimum_dividend: Amount,
        online_weight_minimum: Amount,
    ) -> Self {
        Self {
            network,
            genesis_account,
            genesis_block: genesis_block(genesis_account),
            genesis_amount: GENESIS_AMOUNT,
            epoch_signer: genesis_account,
            epoch_link: epoch_link(),
            dividend_account,
            minimum_dividend,
            work: WorkThresholds::for_network(network),
            online_weight_minimum,
            online_weight_quorum: 50,
            bootstrap_weights: HashMap::new(),
            bootstrap_weight_max_blocks: 0,
        }
    }

    pub fn genesis_hash(&self) -> BlockHash {
        self.genesis_block.hash()
    }

    pub fn is_epoch_link(&self, link: &Link) -> bool {
        *link == self.epoch_link
    }
}

/// The open block crediting the full supply to `account`. Its source is the
/// account itself, since no send precedes it.
fn genesis_block(account: Account) -> Block {
    Block::Open(OpenBlock {
        source: BlockHash::new(*account.as_bytes()),
        representative: account,
        account,
        signature: Signature::default(),
        work: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_hash_is_deterministic() {
        assert_eq!(
            NetworkParams::new(NetworkId::Dev).genesis_hash(),
            NetworkParams::new(NetworkId::Dev).genesis_hash()
        );
    }

    #[test]
    fn networks_have_distinct_genesis() {
        let live = NetworkParams::new(NetworkId::Live).genesis_hash();
        let test = NetworkParams::new(NetworkId::Test).genesis_hash();
        let dev = NetworkParams::new(NetworkId::Dev).genesis_hash();
        assert_ne!(live, test);
        assert_ne!(test, dev);
    }

    #[test]
    fn dev_genesis_is_signed_by_published_key() {
        let params = NetworkParams::dev();
        assert_eq!(params.genesis_account, dev_genesis_key().account);
        assert!(params.genesis_block.verify_signature(&params.genesis_account));
    }

    #[test]
    fn epoch_link_is_recognised() {
        let params = NetworkParams::dev();
        assert!(params.is_epoch_link(&params.epoch_link));
        assert!(!params.is_epoch_link(&Link::ZERO));
        assert_eq!(&params.epoch_link.as_bytes()[..5], b"epoch");
    }
}
