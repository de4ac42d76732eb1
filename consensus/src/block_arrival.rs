//! Recently arrived blocks.
//!
//! Only blocks that arrived live (rather than through bootstrap) start
//! elections after processing. Entries are kept while fewer than
//! [`ARRIVAL_SIZE_MIN`] are held or while younger than [`ARRIVAL_TIME_MIN`].

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use lattice_types::BlockHash;

pub const ARRIVAL_SIZE_MIN: usize = 8 * 1024;
pub const ARRIVAL_TIME_MIN: Duration = Duration::from_secs(300);

#[derive(Debug, Default)]
pub struct BlockArrival {
    order: VecDeque<(Instant, BlockHash)>,
    hashes: HashSet<BlockHash>,
}

impl BlockArrival {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an arrival. Returns true if the hash was already present.
    pub fn add(&mut self, hash: BlockHash, now: Instant) -> bool {
        let existed = !self.hashes.insert(hash);
        if !existed {
            self.order.push_back((now, hash));
        }
        existed
    }

    /// Whether `hash` arrived recently. Prunes expired entries first.
    pub fn recent(&mut self, hash: &BlockHash, now: Instant) -> bool {
        while self.order.len() > ARRIVAL_SIZE_MIN {
            match self.order.front() {
                Some((arrived, _)) if now.saturating_duration_since(*arrived) > ARRIVAL_TIME_MIN => {
                    if let Some((_, old)) = self.order.pop_front() {
                        self.hashes.remove(&old);
                    }
                }
                _ => break,
            }
        }
        self.hashes.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
