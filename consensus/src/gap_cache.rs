//! Blocks we have seen referenced but do not hold.
//!
//! When enough representative weight votes for a missing block, the node
//! is probably behind and should bootstrap.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use lattice_types::{Account, Amount, BlockHash};

use crate::vote::Vote;
use crate::weights::WeightSource;

pub const MAX_GAPS: usize = 256;

pub const BOOTSTRAP_DELAY_LIVE: Duration = Duration::from_secs(5);
pub const BOOTSTRAP_DELAY_DEV: Duration = Duration::from_millis(5);

#[derive(Clone, Debug)]
struct GapInformation {
    arrival: Instant,
    voters: HashSet<Account>,
}

#[derive(Debug, Default)]
pub struct GapCache {
    blocks: HashMap<BlockHash, GapInformation>,
}

/// Weight that must vote for a missing block before bootstrapping.
pub fn bootstrap_threshold(online_stake: Amount) -> Amount {
    Amount::raw(online_stake.number() / 256)
}

impl GapCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a missing hash, refreshing its arrival time if already known.
    /// The oldest entry is evicted past capacity.
    pub fn add(&mut self, hash: BlockHash, now: Instant) {
        if let Some(existing) = self.blocks.get_mut(&hash) {
            existing.arrival = now;
            return;
        }
        self.blocks.insert(
            hash,
            GapInformation {
                arrival: now,
                voters: HashSet::new(),
            },
        );
        if self.blocks.len() > MAX_GAPS {
            let oldest = self
                .blocks
                .iter()
                .min_by_key(|(_, info)| info.arrival)
                .map(|(hash, _)| *hash);
            if let Some(oldest) = oldest {
                self.blocks.remove(&oldest);
            }
        }
    }

    pub fn erase(&mut self, hash: &BlockHash) {
        self.blocks.remove(hash);
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.blocks.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Add the vote's representative to every gap it names. Returns the
    /// hashes whose voters just crossed `threshold`.
    pub fn vote(&mut self, vote: &Vote, weights: &dyn WeightSource, threshold: Amount) -> Vec<BlockHash> {
        let mut ready = Vec::new();
        for hash in vote.hashes() {
            let Some(info) = self.blocks.get_mut(&hash) else {
                continue;
            };
            if !info.voters.insert(vote.account) {
                continue;
            }
            let tally = info
                .voters
                .iter()
                .fold(Amount::ZERO, |acc, voter| acc.saturating_add(weights.weight(voter)));
            let before = tally.saturating_sub(weights.weight(&vote.account));
            if tally > threshold && before <= threshold {
                tracing::debug!(block_hash = %hash, tally = %tally, "missing block has voting weight");
                ready.push(hash);
            }
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_crypto::keypair_from_seed;
    use lattice_types::KeyPair;

    fn key(n: u8) -> KeyPair {
        keypair_from_seed(&[n; 32])
    }

    #[test]
    fn add_refreshes_and_evicts_oldest() {
        let mut cache = GapCache::new();
        let start = Instant::now();
        for n in 0..MAX_GAPS as u64 {
            cache.add(BlockHash::from_u64(n), start + Duration::from_millis(n + 1));
        }
        // refresh the first entry so the second becomes oldest
        cache.add(BlockHash::from_u64(0), start + Duration::from_secs(10));
        cache.add(BlockHash::from_u64(999), start + Duration::from_secs(11));
        assert_eq!(cache.len(), MAX_GAPS);
        assert!(cache.contains(&BlockHash::from_u64(0)));
        assert!(!cache.contains(&BlockHash::from_u64(1)));
        cache.erase(&BlockHash::from_u64(999));
        assert!(!cache.contains(&BlockHash::from_u64(999)));
    }

    #[test]
    fn votes_trigger_once_threshold_crossed() {
        let mut cache = GapCache::new();
        let missing = BlockHash::from_u64(7);
        cache.add(missing, Instant::now());
        let a = key(1);
        let b = key(2);
        let weights: HashMap<Account, Amount> =
            [(a.account, Amount::raw(60)), (b.account, Amount::raw(60))].into();
        let threshold = Amount::raw(100);

        let va = Vote::for_hashes(&a, 1, &[missing, BlockHash::from_u64(8)]).unwrap();
        assert!(cache.vote(&va, &weights, threshold).is_empty());
        // same voter again adds nothing
        assert!(cache.vote(&va, &weights, threshold).is_empty());

        let vb = Vote::for_hashes(&b, 1, &[missing]).unwrap();
        assert_eq!(cache.vote(&vb, &weights, threshold), vec![missing]);
    }

    #[test]
    fn threshold_is_a_256th_of_online_stake() {
        assert_eq!(bootstrap_threshold(Amount::raw(2_560)), Amount::raw(10));
    }
}
