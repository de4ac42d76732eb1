//! Votes by local representatives.
//!
//! Hashes to vote for are collected and sent in batches of up to
//! [`MAX_VOTE_ENTRIES`], waiting briefly so a burst of blocks shares one
//! vote per representative.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lattice_consensus::{Vote, MAX_VOTE_ENTRIES};
use lattice_store::{VoteStore, VoteStoreMut};
use lattice_types::BlockHash;

use crate::node::Node;
use crate::NodeError;

/// How long a partial batch waits for more hashes.
pub const VOTE_GENERATOR_DELAY: Duration = Duration::from_millis(100);

#[derive(Default)]
struct Pending {
    hashes: VecDeque<BlockHash>,
    stopped: bool,
}

#[derive(Default)]
pub struct VoteGenerator {
    pending: Mutex<Pending>,
    condition: Condvar,
}

impl VoteGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, hash: BlockHash) {
        let mut pending = self.lock();
        if pending.stopped {
            return;
        }
        pending.hashes.push_back(hash);
        let full = pending.hashes.len() >= MAX_VOTE_ENTRIES;
        drop(pending);
        if full {
            self.condition.notify_all();
        }
    }

    pub fn size(&self) -> usize {
        self.lock().hashes.len()
    }

    pub fn stop(&self) {
        self.lock().stopped = true;
        self.condition.notify_all();
    }

    pub fn run(&self, node: &Node) {
        let mut pending = self.lock();
        while !pending.stopped {
            if pending.hashes.len() >= MAX_VOTE_ENTRIES {
                let batch = take_batch(&mut pending.hashes);
                drop(pending);
                self.send(node, &batch);
                pending = self.lock();
                continue;
            }
            let deadline = Instant::now() + VOTE_GENERATOR_DELAY;
            while !pending.stopped && pending.hashes.len() < MAX_VOTE_ENTRIES {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                pending = self
                    .condition
                    .wait_timeout(pending, deadline - now)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
            }
            if !pending.stopped && !pending.hashes.is_empty() {
                let batch = take_batch(&mut pending.hashes);
                drop(pending);
                self.send(node, &batch);
                pending = self.lock();
            }
        }
    }

    fn send(&self, node: &Node, hashes: &[BlockHash]) {
        match generate_votes(node, hashes) {
            Ok(votes) => {
                for vote in votes {
                    node.metrics.votes_generated.inc();
                    if let Err(e) = node.vote_processor.vote_blocking(node, &vote, node.network.endpoint(), true) {
                        tracing::error!(error = %e, account = %vote.account, "cannot apply local vote");
                    }
                    node.network.broadcast_confirm_ack(&vote);
                }
            }
            Err(e) => tracing::error!(error = %e, "vote generation failed"),
        }
    }
}

fn take_batch(hashes: &mut VecDeque<BlockHash>) -> Vec<BlockHash> {
    let count = hashes.len().min(MAX_VOTE_ENTRIES);
    hashes.drain(..count).collect()
}

/// Sign one vote per local representative, each at its next sequence.
fn generate_votes(node: &Node, hashes: &[BlockHash]) -> Result<Vec<Vote>, NodeError> {
    let mut txn = node.store.tx_begin_write()?;
    let mut votes = Vec::new();
    let mut failure = None;
    node.wallets.foreach_representative(&mut |key| {
        if failure.is_some() {
            return;
        }
        let result = (|| -> Result<Vote, NodeError> {
            let sequence = txn
                .vote_get::<Vote>(&key.account)?
                .map_or(0, |stored| stored.sequence)
                + 1;
            let vote = Vote::for_hashes(key, sequence, hashes)?;
            txn.vote_put(&key.account, &vote)?;
            Ok(vote)
        })();
        match result {
            Ok(vote) => votes.push(vote),
            Err(e) => failure = Some(e),
        }
    });
    if let Some(e) = failure {
        return Err(e);
    }
    txn.commit()?;
    tracing::debug!(votes = votes.len(), hashes = hashes.len(), "generated votes");
    Ok(votes)
}
