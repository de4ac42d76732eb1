//! Election over the competing blocks at one root.
//!
//! An election starts Unconfirmed and ends either Confirmed (a block reached
//! quorum) or Stopped (abandoned). Neither end state can be left. Votes are
//! rate limited per representative: a representative's next vote counts only
//! once its sequence advances (or, at equal sequence, names a greater hash)
//! and a weight-dependent cooldown has passed since its last counted vote.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use lattice_ledger::Block;
use lattice_types::{Account, Amount, BlockHash, Root, Timestamp};

use crate::weights::WeightSource;

/// Competing blocks kept before a new variant needs a meaningful tally.
pub const MAX_BLOCKS: usize = 10;

/// Election lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElectionState {
    Unconfirmed,
    Confirmed,
    Stopped,
}

/// Outcome summary, final once the election is confirmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElectionStatus {
    pub winner: Block,
    pub tally: Amount,
    pub election_end: Timestamp,
    pub election_duration: Duration,
}

/// Last counted vote of one representative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoteInfo {
    pub time: Instant,
    pub sequence: u64,
    pub hash: BlockHash,
}

/// Stake figures a vote is judged against.
#[derive(Clone, Copy, Debug)]
pub struct Quorum {
    pub online_stake: Amount,
    pub online_weight_minimum: Amount,
    /// Lead the winner needs over the runner-up.
    pub delta: Amount,
    /// Dev networks count votes of any weight.
    pub is_dev: bool,
}

impl Quorum {
    pub fn new(online_stake: Amount, online_weight_minimum: Amount, quorum_percent: u8, is_dev: bool) -> Self {
        Self {
            online_stake,
            online_weight_minimum,
            delta: Amount::raw(online_stake.number() / 100 * u128::from(quorum_percent)),
            is_dev,
        }
    }
}

/// What a recount asks of the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuorumOutcome {
    /// New leader that must replace the ledger's block at this root.
    pub replacement: Option<Block>,
    /// Set exactly once, when the election confirms.
    pub confirmed: Option<ElectionStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoteOutcome {
    /// The representative's sequence did not advance.
    pub replay: bool,
    /// The vote was counted.
    pub processed: bool,
    pub quorum: QuorumOutcome,
}

/// Minimum spacing between counted votes of a representative with `weight`.
pub fn vote_cooldown(weight: Amount, online_stake: Amount) -> Duration {
    let stake = online_stake.number();
    if weight.number() < stake / 100 {
        Duration::from_secs(15)
    } else if weight.number() < stake / 20 {
        Duration::from_secs(5)
    } else {
        Duration::from_secs(1)
    }
}

#[derive(Clone, Debug)]
pub struct Election {
    root: Root,
    state: ElectionState,
    blocks: HashMap<BlockHash, Block>,
    last_votes: HashMap<Account, VoteInfo>,
    last_tally: HashMap<BlockHash, Amount>,
    status: ElectionStatus,
    started: Instant,
    /// Announce-loop passes this election has seen.
    pub announcements: u32,
}

impl Election {
    pub fn new(block: Block, now: Instant) -> Self {
        let hash = block.hash();
        let root = block.root();
        let mut blocks = HashMap::new();
        blocks.insert(hash, block.clone());
        Self {
            root,
            state: ElectionState::Unconfirmed,
            blocks,
            last_votes: HashMap::new(),
            last_tally: HashMap::new(),
            status: ElectionStatus {
                winner: block,
                tally: Amount::ZERO,
                election_end: Timestamp::EPOCH,
                election_duration: Duration::ZERO,
            },
            started: now,
            announcements: 0,
        }
    }

    pub fn root(&self) -> Root {
        self.root
    }

    pub fn state(&self) -> ElectionState {
        self.state
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == ElectionState::Confirmed
    }

    pub fn is_stopped(&self) -> bool {
        self.state == ElectionState::Stopped
    }

    pub fn status(&self) -> &ElectionStatus {
        &self.status
    }

    pub fn winner(&self) -> &Block {
        &self.status.winner
    }

    pub fn blocks(&self) -> &HashMap<BlockHash, Block> {
        &self.blocks
    }

    pub fn last_votes(&self) -> &HashMap<Account, VoteInfo> {
        &self.last_votes
    }

    pub fn last_tally(&self) -> &HashMap<BlockHash, Amount> {
        &self.last_tally
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Abandon the election. Has no effect once confirmed.
    pub fn stop(&mut self) {
        if self.state == ElectionState::Unconfirmed {
            self.state = ElectionState::Stopped;
        }
    }

    /// Count a vote by `representative` for `hash`.
    pub fn vote(
        &mut self,
        representative: &Account,
        sequence: u64,
        hash: &BlockHash,
        weights: &dyn WeightSource,
        quorum: &Quorum,
        now: Instant,
    ) -> VoteOutcome {
        let mut outcome = VoteOutcome::default();
        let weight = weights.weight(representative);
        if !quorum.is_dev && weight.number() <= quorum.online_stake.number() / 1000 {
            return outcome;
        }
        let cooldown = vote_cooldown(weight, quorum.online_stake);
        let should_process = match self.last_votes.get(representative) {
            None => true,
            Some(last) => {
                let advances = last.sequence < sequence || (last.sequence == sequence && last.hash < *hash);
                if advances {
                    now.saturating_duration_since(last.time) >= cooldown
                } else {
                    outcome.replay = true;
                    false
                }
            }
        };
        if should_process {
            self.last_votes.insert(
                *representative,
                VoteInfo {
                    time: now,
                    sequence,
                    hash: *hash,
                },
            );
            outcome.processed = true;
            if self.state == ElectionState::Unconfirmed {
                outcome.quorum = self.confirm_if_quorum(weights, quorum, now);
            }
        }
        outcome
    }

    /// Weight behind each known block, heaviest first. Votes for hashes the
    /// election does not hold are counted in [`last_tally`](Self::last_tally)
    /// only.
    pub fn tally(&mut self, weights: &dyn WeightSource) -> Vec<(Amount, Block)> {
        let mut by_block: HashMap<BlockHash, Amount> = HashMap::new();
        for (rep, info) in &self.last_votes {
            let entry = by_block.entry(info.hash).or_default();
            *entry = entry.saturating_add(weights.weight(rep));
        }
        let mut result: Vec<(Amount, Block)> = by_block
            .iter()
            .filter_map(|(hash, weight)| self.blocks.get(hash).map(|b| (*weight, b.clone())))
            .collect();
        result.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.hash().cmp(&a.1.hash())));
        self.last_tally = by_block;
        result
    }

    /// Recount, switch the winner to the leader once enough weight voted,
    /// and confirm when the leader has quorum.
    pub fn confirm_if_quorum(&mut self, weights: &dyn WeightSource, quorum: &Quorum, now: Instant) -> QuorumOutcome {
        let mut outcome = QuorumOutcome::default();
        let tally = self.tally(weights);
        let Some((leader_weight, leader)) = tally.first() else {
            return outcome;
        };
        self.status.tally = *leader_weight;
        let sum = tally
            .iter()
            .fold(Amount::ZERO, |acc, (weight, _)| acc.saturating_add(*weight));
        if sum >= quorum.online_weight_minimum && leader.hash() != self.status.winner.hash() {
            self.status.winner = leader.clone();
            outcome.replacement = Some(leader.clone());
        }
        if Self::have_quorum(&tally, sum, quorum) {
            if self.blocks.len() > 1 {
                tracing::debug!(
                    root = %self.root,
                    winner = %self.status.winner.hash(),
                    tally = %self.status.tally,
                    blocks = self.blocks.len(),
                    "fork resolved"
                );
            }
            outcome.confirmed = self.confirm_once(now);
        }
        outcome
    }

    fn have_quorum(tally: &[(Amount, Block)], sum: Amount, quorum: &Quorum) -> bool {
        let first = tally.first().map(|(w, _)| *w).unwrap_or_default();
        let second = tally.get(1).map(|(w, _)| *w).unwrap_or_default();
        sum >= quorum.online_weight_minimum && first > second.saturating_add(quorum.delta)
    }

    fn confirm_once(&mut self, now: Instant) -> Option<ElectionStatus> {
        if self.state != ElectionState::Unconfirmed {
            return None;
        }
        self.state = ElectionState::Confirmed;
        self.status.election_end = Timestamp::now();
        self.status.election_duration = now.saturating_duration_since(self.started);
        Some(self.status.clone())
    }

    /// Offer an alternative block for this root. `fits` says whether the
    /// ledger could currently apply it. Returns true when the block was new
    /// and has been added; the caller then recounts and republishes.
    pub fn publish(&mut self, block: &Block, fits: bool, online_stake: Amount) -> bool {
        let hash = block.hash();
        if self.blocks.len() >= MAX_BLOCKS {
            let tally = self.last_tally.get(&hash).copied().unwrap_or_default();
            if tally.number() < online_stake.number() / 10 {
                return false;
            }
        }
        if !fits || self.blocks.contains_key(&hash) {
            return false;
        }
        self.blocks.insert(hash, block.clone());
        true
    }
}
