//! Incoming vote pipeline.
//!
//! Votes queue up from the network and are handled in batches by one worker:
//! signatures are checked together, each representative's highest-sequence
//! vote is persisted, and then every vote is applied to the active elections.

use std::collections::VecDeque;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use lattice_consensus::{bootstrap_threshold, validate_batch, Vote};
use lattice_store::{Transaction, VoteStore, VoteStoreMut, WriteTransaction};
use lattice_types::{Account, Amount};

use crate::node::Node;
use crate::{NodeError, NodeEvent};

/// Queue length below which every vote is admitted.
const QUEUE_OPEN: usize = 96 * 1024;
/// Upper bound; past this nothing is admitted outside the dev network.
pub const VOTE_QUEUE_MAX: usize = 144 * 1024;

/// A stored vote this far ahead of an incoming one is echoed back so the
/// sender learns our view of the representative's sequence.
const SEQUENCE_ECHO_GAP: u64 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoteCode {
    /// Bad signature or malformed.
    Invalid,
    /// Nothing new for any election.
    Replay,
    /// Counted by at least one election, or for no election at all.
    Vote,
}

impl VoteCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteCode::Invalid => "invalid",
            VoteCode::Replay => "replay",
            VoteCode::Vote => "vote",
        }
    }
}

impl fmt::Display for VoteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a vote from a representative with `weight` may join a queue
/// holding `queued` votes. The fuller the queue, the heavier the
/// representative must be.
pub fn admit(queued: usize, weight: Amount, online_stake: Amount, is_dev: bool) -> bool {
    if is_dev || queued < QUEUE_OPEN {
        return true;
    }
    let stake = online_stake.number();
    let weight = weight.number();
    if queued < 112 * 1024 {
        weight > stake / 1000
    } else if queued < 128 * 1024 {
        weight > stake / 100
    } else if queued < VOTE_QUEUE_MAX {
        weight > stake / 20
    } else {
        false
    }
}

#[derive(Default)]
struct VoteQueue {
    votes: VecDeque<(Vote, SocketAddr)>,
    stopped: bool,
    active: bool,
}

#[derive(Default)]
pub struct VoteProcessor {
    queue: Mutex<VoteQueue>,
    condition: Condvar,
}

impl VoteProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VoteQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a vote from `endpoint`. Returns whether it was admitted.
    pub fn add(&self, node: &Node, vote: Vote, endpoint: SocketAddr) -> bool {
        let weight = node.ledger.weight(&vote.account);
        let online_stake = node.online_stake();
        let mut queue = self.lock();
        if queue.stopped || !admit(queue.votes.len(), weight, online_stake, node.params.network.is_dev()) {
            node.metrics.votes_processed.with_label_values(&["overflow"]).inc();
            return false;
        }
        queue.votes.push_back((vote, endpoint));
        node.metrics.vote_queue.set(queue.votes.len() as i64);
        drop(queue);
        self.condition.notify_all();
        true
    }

    pub fn size(&self) -> usize {
        self.lock().votes.len()
    }

    pub fn flush(&self) {
        let mut queue = self.lock();
        while !queue.stopped && (queue.active || !queue.votes.is_empty()) {
            queue = self.condition.wait(queue).unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn stop(&self) {
        self.lock().stopped = true;
        self.condition.notify_all();
    }

    pub fn run(&self, node: &Node) {
        let mut queue = self.lock();
        while !queue.stopped {
            if queue.votes.is_empty() {
                self.condition.notify_all();
                queue = self.condition.wait(queue).unwrap_or_else(PoisonError::into_inner);
                continue;
            }
            let batch: Vec<(Vote, SocketAddr)> = queue.votes.drain(..).collect();
            queue.active = true;
            drop(queue);

            let started = Instant::now();
            if let Err(e) = self.process_batch(node, batch) {
                tracing::error!(error = %e, "vote batch failed");
            }
            let elapsed = started.elapsed();
            if elapsed.as_millis() >= 100 {
                tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "slow vote batch");
            }

            queue = self.lock();
            queue.active = false;
            node.metrics.vote_queue.set(queue.votes.len() as i64);
        }
    }

    fn process_batch(&self, node: &Node, batch: Vec<(Vote, SocketAddr)>) -> Result<(), NodeError> {
        let verdicts = {
            let votes: Vec<&Vote> = batch.iter().map(|(vote, _)| vote).collect();
            validate_batch(&votes)
        };
        let mut valid = Vec::with_capacity(batch.len());
        for ((vote, endpoint), ok) in batch.into_iter().zip(verdicts) {
            if ok {
                valid.push((vote, endpoint));
            } else {
                self.record(node, &vote, VoteCode::Invalid);
            }
        }
        if valid.is_empty() {
            return Ok(());
        }

        let mut echoes = Vec::new();
        {
            let mut txn = node.store.tx_begin_write()?;
            for (vote, endpoint) in &valid {
                if let Some(max) = store_max_vote(txn.as_mut(), vote)? {
                    echoes.push((*endpoint, max));
                }
            }
            txn.commit()?;
        }
        for (endpoint, max) in &echoes {
            node.network.send_confirm_ack(*endpoint, max);
        }
        for (vote, endpoint) in &valid {
            self.apply(node, vote, *endpoint);
        }
        Ok(())
    }

    /// Handle one vote synchronously. `validated` skips the signature check.
    pub fn vote_blocking(
        &self,
        node: &Node,
        vote: &Vote,
        endpoint: SocketAddr,
        validated: bool,
    ) -> Result<VoteCode, NodeError> {
        if !validated && !vote.validate() {
            self.record(node, vote, VoteCode::Invalid);
            return Ok(VoteCode::Invalid);
        }
        let echo = {
            let mut txn = node.store.tx_begin_write()?;
            let echo = store_max_vote(txn.as_mut(), vote)?;
            txn.commit()?;
            echo
        };
        if let Some(max) = echo {
            node.network.send_confirm_ack(endpoint, &max);
        }
        Ok(self.apply(node, vote, endpoint))
    }

    fn apply(&self, node: &Node, vote: &Vote, endpoint: SocketAddr) -> VoteCode {
        let replay = node.active.vote(node, vote);
        let code = if replay { VoteCode::Replay } else { VoteCode::Vote };

        let now = Instant::now();
        let weight = node.ledger.weight(&vote.account);
        node.online_reps_lock().observe(&vote.account, weight, now);

        let queried = {
            let crawler = node.rep_crawler_lock();
            vote.hashes().iter().any(|hash| crawler.exists(hash))
        };
        if queried && node.rep_crawler_lock().response(endpoint, vote.account, weight, now) {
            tracing::info!(representative = %vote.account, %endpoint, weight = %weight, "found representative");
        }

        if code == VoteCode::Vote {
            let threshold = bootstrap_threshold(node.online_stake());
            let missing = node.gap_cache_lock().vote(vote, &node.ledger, threshold);
            for hash in missing {
                node.bootstrap_check(hash);
            }
        }
        node.events.emit(&NodeEvent::Vote {
            representative: vote.account,
            endpoint,
        });
        self.record(node, vote, code);
        code
    }

    fn record(&self, node: &Node, vote: &Vote, code: VoteCode) {
        node.metrics.votes_processed.with_label_values(&[code.as_str()]).inc();
        tracing::trace!(representative = %vote.account, sequence = vote.sequence, code = %code, "vote processed");
    }
}

/// Persist `vote` if it is the representative's highest sequence so far.
/// Returns the stored vote when it is far enough ahead to be echoed back.
fn store_max_vote(txn: &mut dyn WriteTransaction, vote: &Vote) -> Result<Option<Vote>, NodeError> {
    match txn.vote_get::<Vote>(&vote.account)? {
        Some(stored) if stored.sequence >= vote.sequence => {
            if stored.sequence > vote.sequence.saturating_add(SEQUENCE_ECHO_GAP) {
                Ok(Some(stored))
            } else {
                Ok(None)
            }
        }
        _ => {
            txn.vote_put(&vote.account, vote)?;
            Ok(None)
        }
    }
}

/// Highest-sequence vote stored for `representative`, if any.
pub fn max_vote(txn: &dyn Transaction, representative: &Account) -> Result<Option<Vote>, NodeError> {
    Ok(txn.vote_get::<Vote>(representative)?)
}
