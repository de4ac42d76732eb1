//! Representative crawler.
//!
//! The node periodically sends `confirm_req` for a random ledger block to
//! peers and records the query hash here. A vote arriving for an active
//! query reveals which representative sits behind the sending endpoint.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use lattice_types::{Account, Amount, BlockHash};

/// A peer known to speak for a representative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepresentativePeer {
    pub endpoint: SocketAddr,
    pub account: Account,
    pub weight: Amount,
    pub last_response: Instant,
}

#[derive(Debug, Default)]
pub struct RepCrawler {
    active: HashSet<BlockHash>,
    peers: HashMap<SocketAddr, RepresentativePeer>,
}

impl RepCrawler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a crawl query for `hash`.
    pub fn add(&mut self, hash: BlockHash) {
        self.active.insert(hash);
    }

    pub fn remove(&mut self, hash: &BlockHash) {
        self.active.remove(hash);
    }

    /// Whether `hash` belongs to an outstanding crawl query.
    pub fn exists(&self, hash: &BlockHash) -> bool {
        self.active.contains(hash)
    }

    /// Record that `endpoint` answered for `account`. Returns true when the
    /// endpoint was not previously known as a representative.
    pub fn response(&mut self, endpoint: SocketAddr, account: Account, weight: Amount, now: Instant) -> bool {
        let peer = RepresentativePeer {
            endpoint,
            account,
            weight,
            last_response: now,
        };
        let fresh = match self.peers.insert(endpoint, peer) {
            None => true,
            Some(previous) => previous.account != account,
        };
        if fresh {
            tracing::info!(%endpoint, representative = %account, weight = %weight, "found representative");
        }
        fresh
    }

    /// Up to `count` representative peers, heaviest first.
    pub fn representatives(&self, count: usize) -> Vec<RepresentativePeer> {
        let mut reps: Vec<RepresentativePeer> = self.peers.values().cloned().collect();
        reps.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.endpoint.cmp(&b.endpoint)));
        reps.truncate(count);
        reps
    }

    /// Combined weight of reachable representatives, each counted once.
    pub fn total_weight(&self) -> Amount {
        let mut seen = HashSet::new();
        self.peers
            .values()
            .filter(|p| seen.insert(p.account))
            .fold(Amount::ZERO, |acc, p| acc.saturating_add(p.weight))
    }

    /// Forget peers that have not answered within `cutoff`.
    pub fn cleanup(&mut self, cutoff: Duration, now: Instant) {
        self.peers
            .retain(|_, peer| now.saturating_duration_since(peer.last_response) <= cutoff);
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
