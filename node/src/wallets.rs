//! Local wallets as seen by the node core.
//!
//! Key storage and block creation are the wallet's business. The node asks
//! which representatives it may vote with, and hands over confirmed sends
//! and dividends that local accounts should act on.

use std::sync::Mutex;

use lattice_ledger::Block;
use lattice_types::{Account, BlockHash, KeyPair};

pub trait Wallets: Send + Sync {
    /// Run `action` for every local key that holds voting weight.
    fn foreach_representative(&self, action: &mut dyn FnMut(&KeyPair));

    /// Whether `account` is held locally.
    fn exists(&self, account: &Account) -> bool;

    /// Every locally held account.
    fn accounts(&self) -> Vec<Account>;

    /// A confirmed `send` to local `destination` is ready to receive.
    fn receive_confirmed(&self, send: &Block, destination: &Account);

    /// Local `account` can claim its share of `dividend`.
    fn claim_dividend(&self, account: &Account, dividend: &BlockHash);

    /// Called once when the node stops.
    fn stop(&self) {}
}

/// Wallets with fixed keys that record what the node asked of them.
pub struct NullWallets {
    keys: Vec<KeyPair>,
    representatives: Vec<Account>,
    received: Mutex<Vec<(BlockHash, Account)>>,
    claims: Mutex<Vec<(Account, BlockHash)>>,
}

impl NullWallets {
    pub fn new() -> Self {
        Self::with_keys(Vec::new())
    }

    /// Every key is both a local account and a voting representative.
    pub fn with_keys(keys: Vec<KeyPair>) -> Self {
        let representatives = keys.iter().map(|k| k.account).collect();
        Self {
            keys,
            representatives,
            received: Mutex::new(Vec::new()),
            claims: Mutex::new(Vec::new()),
        }
    }

    /// Keep only the given accounts as voting representatives.
    pub fn voting_only(mut self, representatives: &[Account]) -> Self {
        self.representatives = representatives.to_vec();
        self
    }

    /// `(send hash, destination)` of every receive requested so far.
    pub fn received(&self) -> Vec<(BlockHash, Account)> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// `(account, dividend)` of every claim requested so far.
    pub fn claims(&self) -> Vec<(Account, BlockHash)> {
        self.claims.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Default for NullWallets {
    fn default() -> Self {
        Self::new()
    }
}

impl Wallets for NullWallets {
    fn foreach_representative(&self, action: &mut dyn FnMut(&KeyPair)) {
        for key in &self.keys {
            if self.representatives.contains(&key.account) {
                action(key);
            }
        }
    }

    fn exists(&self, account: &Account) -> bool {
        self.keys.iter().any(|k| k.account == *account)
    }

    fn accounts(&self) -> Vec<Account> {
        self.keys.iter().map(|k| k.account).collect()
    }

    fn receive_confirmed(&self, send: &Block, destination: &Account) {
        if let Ok(mut received) = self.received.lock() {
            received.push((send.hash(), *destination));
        }
    }

    fn claim_dividend(&self, account: &Account, dividend: &BlockHash) {
        if let Ok(mut claims) = self.claims.lock() {
            claims.push((*account, *dividend));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_crypto::keypair_from_seed;

    #[test]
    fn representatives_can_be_restricted() {
        let a = keypair_from_seed(&[1; 32]);
        let b = keypair_from_seed(&[2; 32]);
        let wallets = NullWallets::with_keys(vec![a.clone(), b.clone()]).voting_only(&[b.account]);
        let mut voters = Vec::new();
        wallets.foreach_representative(&mut |k| voters.push(k.account));
        assert_eq!(voters, vec![b.account]);
        assert!(wallets.exists(&a.account));
        assert_eq!(wallets.accounts(), vec![a.account, b.account]);
    }
}
