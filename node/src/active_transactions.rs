//! Elections in progress, keyed by root.
//!
//! A single mutex guards every election. It is never held while a store
//! transaction is open: ledger checks for the announce loop run between two
//! short critical sections, and votes and publishes return the work they
//! cause as [`ElectionActions`] for the caller to carry out unlocked.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lattice_consensus::{
    ConfirmationHistory, Election, ElectionState, ElectionStatus, Quorum, QuorumOutcome, Vote, VoteEntry,
    WeightSource,
};
use lattice_ledger::Block;
use lattice_types::{Account, BlockHash, NetworkId, Root};

use crate::node::Node;

/// Runs once with the winner when an election confirms.
pub type ConfirmationCallback = Arc<dyn Fn(&Block) + Send + Sync>;

/// Passes a finished election stays listed before it is retired.
pub const ANNOUNCEMENT_MIN: u32 = 2;
/// Passes after which an election counts as long-running.
pub const ANNOUNCEMENT_LONG: u32 = 20;

const MAX_CONFIRM_REPRESENTATIVES: usize = 10;
const MAX_CONFIRM_PEERS: usize = 32;
const ESCALATE_MAX_ROOTS: usize = 100;
const BROADCAST_INTERVAL: Duration = Duration::from_millis(10);

/// Delay between announce passes with `roots` elections active.
pub fn announce_interval(network: NetworkId, roots: usize) -> Duration {
    let base = if network.is_dev() {
        Duration::from_millis(10)
    } else {
        Duration::from_secs(16)
    };
    base + BROADCAST_INTERVAL * 2 * roots.min(1000) as u32
}

struct ConflictInfo {
    election: Election,
    callback: Option<ConfirmationCallback>,
}

struct ActiveState {
    roots: HashMap<Root, ConflictInfo>,
    /// Every block of every election, to find elections from vote hashes.
    successors: HashMap<BlockHash, Root>,
    history: ConfirmationHistory,
    stopped: bool,
}

/// Follow-up work produced while the election lock was held.
#[derive(Default)]
pub struct ElectionActions {
    /// Winners that must replace the ledger's block at their root.
    pub replacements: Vec<Block>,
    pub confirmed: Vec<(ElectionStatus, Option<ConfirmationCallback>)>,
    pub republish: Vec<Block>,
}

impl ElectionActions {
    fn collect(&mut self, outcome: QuorumOutcome, callback: &Option<ConfirmationCallback>) {
        if let Some(block) = outcome.replacement {
            self.replacements.push(block);
        }
        if let Some(status) = outcome.confirmed {
            self.confirmed.push((status, callback.clone()));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty() && self.confirmed.is_empty() && self.republish.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoteResult {
    /// Some election saw a sequence that did not advance.
    pub replay: bool,
    /// Some election counted the vote.
    pub processed: bool,
}

/// What one announce pass asks the node to send.
#[derive(Default)]
pub struct AnnouncePass {
    pub republish: Vec<Block>,
    /// Winners to request votes for, with the representatives that already voted.
    pub confirm_requests: Vec<(Block, HashSet<Account>)>,
    /// Winners local representatives should vote for.
    pub vote_hashes: Vec<BlockHash>,
    pub stopped: usize,
}

struct Snapshot {
    root: Root,
    winner: Block,
    announcements: u32,
}

pub struct ActiveTransactions {
    state: Mutex<ActiveState>,
    condition: Condvar,
}

impl Default for ActiveTransactions {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveTransactions {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ActiveState {
                roots: HashMap::new(),
                successors: HashMap::new(),
                history: ConfirmationHistory::default(),
                stopped: false,
            }),
            condition: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ActiveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Begin an election for `block`'s root. Returns false if one is already
    /// running or the container is stopped.
    pub fn start(&self, block: Block, callback: Option<ConfirmationCallback>, now: Instant) -> bool {
        let mut guard = self.lock();
        if guard.stopped {
            return false;
        }
        let root = block.root();
        if guard.roots.contains_key(&root) {
            return false;
        }
        let hash = block.hash();
        tracing::debug!(block_hash = %hash, root = %root, "election started");
        guard.successors.insert(hash, root);
        guard.roots.insert(
            root,
            ConflictInfo {
                election: Election::new(block, now),
                callback,
            },
        );
        true
    }

    /// Count `vote` in every election it names.
    pub fn apply_vote(
        &self,
        vote: &Vote,
        weights: &dyn WeightSource,
        quorum: &Quorum,
        now: Instant,
    ) -> (VoteResult, ElectionActions) {
        let mut result = VoteResult::default();
        let mut actions = ElectionActions::default();
        let mut guard = self.lock();
        let state = &mut *guard;
        for entry in &vote.entries {
            let hash = entry.hash();
            let root = match entry {
                VoteEntry::Block(block) => Some(block.root()),
                VoteEntry::Hash(hash) => state.successors.get(hash).copied(),
            };
            let Some(info) = root.and_then(|root| state.roots.get_mut(&root)) else {
                continue;
            };
            let outcome = info
                .election
                .vote(&vote.account, vote.sequence, &hash, weights, quorum, now);
            result.replay |= outcome.replay;
            result.processed |= outcome.processed;
            actions.collect(outcome.quorum, &info.callback);
        }
        (result, actions)
    }

    /// Offer `block` to the election at its root. `fits` is whether the
    /// ledger could apply it now. Returns true when it was added.
    pub fn apply_publish(
        &self,
        block: &Block,
        fits: bool,
        weights: &dyn WeightSource,
        quorum: &Quorum,
        now: Instant,
    ) -> (bool, ElectionActions) {
        let mut actions = ElectionActions::default();
        let mut guard = self.lock();
        let state = &mut *guard;
        let root = block.root();
        let Some(info) = state.roots.get_mut(&root) else {
            return (false, actions);
        };
        let added = info.election.publish(block, fits, quorum.online_stake);
        if added {
            state.successors.insert(block.hash(), root);
            if info.election.state() == ElectionState::Unconfirmed {
                let outcome = info.election.confirm_if_quorum(weights, quorum, now);
                actions.collect(outcome, &info.callback);
            }
            actions.republish.push(block.clone());
        }
        (added, actions)
    }

    /// Count a vote and carry out what it causes. Returns whether it was a
    /// replay.
    pub fn vote(&self, node: &Node, vote: &Vote) -> bool {
        let quorum = node.quorum();
        let (result, actions) = self.apply_vote(vote, &node.ledger, &quorum, Instant::now());
        node.dispatch(actions);
        result.replay
    }

    /// Add a competing block to its election, if one is running.
    pub fn publish(&self, node: &Node, block: &Block) -> bool {
        let fits = match node.store.tx_begin_read() {
            Ok(txn) => node.ledger.could_fit(txn.as_ref(), block).unwrap_or(false),
            Err(e) => {
                tracing::warn!(error = %e, "cannot open read transaction for publish");
                return false;
            }
        };
        let quorum = node.quorum();
        let (added, actions) = self.apply_publish(block, fits, &node.ledger, &quorum, Instant::now());
        node.dispatch(actions);
        added
    }

    pub fn active(&self, root: &Root) -> bool {
        self.lock().roots.contains_key(root)
    }

    /// Whether `hash` is a candidate in any running election.
    pub fn active_block(&self, hash: &BlockHash) -> bool {
        self.lock().successors.contains_key(hash)
    }

    /// A copy of the election at `root`.
    pub fn election(&self, root: &Root) -> Option<Election> {
        self.lock().roots.get(root).map(|info| info.election.clone())
    }

    pub fn size(&self) -> usize {
        self.lock().roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Confirmed elections retired so far, oldest first.
    pub fn list_confirmed(&self) -> Vec<ElectionStatus> {
        self.lock().history.list()
    }

    /// Drop the election containing `block` without recording it.
    pub fn erase(&self, block: &Block) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if let Some(info) = state.roots.remove(&block.root()) {
            for hash in info.election.blocks().keys() {
                state.successors.remove(hash);
            }
            tracing::debug!(root = %block.root(), "election erased");
        }
    }

    pub fn stop(&self) {
        let mut guard = self.lock();
        guard.stopped = true;
        guard.roots.clear();
        guard.successors.clear();
        drop(guard);
        self.condition.notify_all();
    }

    /// Advance every election by one announcement. `fits` holds, for the
    /// elections due a republish, whether the winner could be applied.
    pub fn announce_pass(&self, fits: &HashMap<Root, bool>) -> AnnouncePass {
        let mut pass = AnnouncePass::default();
        let mut guard = self.lock();
        let state = &mut *guard;
        let mut inactive = Vec::new();
        for (root, info) in state.roots.iter_mut() {
            let election = &mut info.election;
            let announcements = election.announcements;
            if election.state() != ElectionState::Unconfirmed {
                if announcements >= ANNOUNCEMENT_MIN - 1 {
                    inactive.push(*root);
                }
            } else {
                if announcements > ANNOUNCEMENT_LONG && announcements % ANNOUNCEMENT_LONG == 1 {
                    tracing::info!(root = %root, announcements, "election is taking long");
                }
                if announcements < ANNOUNCEMENT_LONG || announcements % ANNOUNCEMENT_LONG == 1 {
                    match fits.get(root) {
                        Some(true) => pass.republish.push(election.winner().clone()),
                        Some(false) if announcements > 3 => {
                            election.stop();
                            pass.stopped += 1;
                        }
                        _ => {}
                    }
                }
                if election.state() == ElectionState::Unconfirmed {
                    if announcements % 4 == 1 {
                        let voters = election.last_votes().keys().copied().collect();
                        pass.confirm_requests.push((election.winner().clone(), voters));
                    }
                    pass.vote_hashes.push(election.winner().hash());
                }
            }
            election.announcements += 1;
        }
        for root in inactive {
            if let Some(info) = state.roots.remove(&root) {
                for hash in info.election.blocks().keys() {
                    state.successors.remove(hash);
                }
                if info.election.is_confirmed() {
                    state.history.push(info.election.status().clone());
                }
            }
        }
        pass
    }

    /// One announce pass against the live node.
    pub fn request_confirm(&self, node: &Node) {
        let snapshots: Vec<Snapshot> = {
            let guard = self.lock();
            guard
                .roots
                .iter()
                .filter(|(_, info)| info.election.state() == ElectionState::Unconfirmed)
                .map(|(root, info)| Snapshot {
                    root: *root,
                    winner: info.election.winner().clone(),
                    announcements: info.election.announcements,
                })
                .collect()
        };
        let escalate = node.params.network.is_live() && snapshots.len() < ESCALATE_MAX_ROOTS;

        let mut fits = HashMap::new();
        let mut escalations = Vec::new();
        match node.store.tx_begin_read() {
            Ok(txn) => {
                let txn = txn.as_ref();
                for snapshot in &snapshots {
                    let a = snapshot.announcements;
                    if a < ANNOUNCEMENT_LONG || a % ANNOUNCEMENT_LONG == 1 {
                        let fit = node.ledger.could_fit(txn, &snapshot.winner).unwrap_or(false);
                        fits.insert(snapshot.root, fit);
                    }
                    if escalate && a > ANNOUNCEMENT_LONG && a % ANNOUNCEMENT_LONG == 1 {
                        let mut dependencies = vec![snapshot.winner.previous()];
                        if let Ok(source) = node.ledger.block_source(txn, &snapshot.winner) {
                            dependencies.push(source);
                        }
                        for dependency in dependencies.into_iter().filter(|h| !h.is_zero()) {
                            if let Ok(Some(block)) = node.ledger.get_block(txn, &dependency) {
                                escalations.push(block);
                            }
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "announce pass skipped, cannot open read transaction");
                return;
            }
        }

        let pass = self.announce_pass(&fits);
        node.metrics.elections_stopped.inc_by(pass.stopped as u64);
        node.metrics.active_elections.set(self.size() as i64);

        for block in &pass.republish {
            node.network.republish_block(block);
        }
        if !pass.confirm_requests.is_empty() {
            self.send_confirm_requests(node, &pass.confirm_requests);
        }
        if node.config.enable_voting {
            for hash in pass.vote_hashes {
                node.vote_generator.add(hash);
            }
        }
        for block in escalations {
            node.start_election(block, None);
        }
    }

    fn send_confirm_requests(&self, node: &Node, requests: &[(Block, HashSet<Account>)]) {
        let (representatives, reachable) = {
            let crawler = node.rep_crawler_lock();
            (crawler.representatives(usize::MAX), crawler.total_weight())
        };
        if representatives.is_empty() || reachable < node.params.online_weight_minimum {
            let peers = node.network.random_peers(MAX_CONFIRM_PEERS);
            for (block, _) in requests {
                for peer in &peers {
                    node.network.send_confirm_req(*peer, block);
                }
            }
            return;
        }
        for (block, voters) in requests {
            for rep in representatives
                .iter()
                .filter(|rep| !voters.contains(&rep.account))
                .take(MAX_CONFIRM_REPRESENTATIVES)
            {
                node.network.send_confirm_req(rep.endpoint, block);
            }
        }
    }

    /// Announce loop body; returns when stopped.
    pub fn run(&self, node: &Node) {
        loop {
            if self.lock().stopped {
                break;
            }
            self.request_confirm(node);
            let guard = self.lock();
            if guard.stopped {
                break;
            }
            let interval = announce_interval(node.params.network, guard.roots.len());
            let _ = self
                .condition
                .wait_timeout(guard, interval)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_crypto::keypair_from_seed;
    use lattice_ledger::SendBlock;
    use lattice_types::{Amount, KeyPair, Signature};

    fn block(n: u64) -> Block {
        block_at(1, n)
    }

    fn block_at(previous: u64, n: u64) -> Block {
        Block::Send(SendBlock {
            previous: BlockHash::from_u64(previous),
            destination: Account::from_u64(n),
            balance: Amount::raw(n.into()),
            signature: Signature::default(),
            work: 0,
        })
    }

    fn rep(n: u8) -> KeyPair {
        keypair_from_seed(&[n; 32])
    }

    fn quorum() -> Quorum {
        Quorum::new(Amount::raw(100), Amount::raw(60), 50, true)
    }

    #[test]
    fn one_election_per_root() {
        let active = ActiveTransactions::new();
        let now = Instant::now();
        assert!(active.start(block(1), None, now));
        assert!(!active.start(block(2), None, now));
        assert!(active.active(&block(1).root()));
        assert!(active.active_block(&block(1).hash()));
        assert!(!active.active_block(&block(2).hash()));
        assert_eq!(active.size(), 1);
    }

    #[test]
    fn hash_votes_find_their_election() {
        let active = ActiveTransactions::new();
        let now = Instant::now();
        active.start(block(1), None, now);
        let key = rep(1);
        let weights: HashMap<Account, Amount> = [(key.account, Amount::raw(90))].into();

        let vote = Vote::for_hashes(&key, 1, &[block(1).hash()]).unwrap();
        let (result, actions) = active.apply_vote(&vote, &weights, &quorum(), now);
        assert!(result.processed);
        assert!(!result.replay);
        assert_eq!(actions.confirmed.len(), 1);
        assert_eq!(actions.confirmed[0].0.winner, block(1));

        let (result, actions) = active.apply_vote(&vote, &weights, &quorum(), now);
        assert!(result.replay);
        assert!(actions.is_empty());
    }

    #[test]
    fn unrelated_votes_are_neither_processed_nor_replays() {
        let active = ActiveTransactions::new();
        let key = rep(1);
        let weights: HashMap<Account, Amount> = [(key.account, Amount::raw(90))].into();
        let vote = Vote::for_hashes(&key, 1, &[BlockHash::from_u64(77)]).unwrap();
        let (result, _) = active.apply_vote(&vote, &weights, &quorum(), Instant::now());
        assert_eq!(result, VoteResult::default());
    }

    #[test]
    fn published_fork_can_win_and_needs_replacement() {
        let active = ActiveTransactions::new();
        let now = Instant::now();
        let callback_hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let hits = callback_hits.clone();
        let callback: ConfirmationCallback = Arc::new(move |_| {
            hits.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        active.start(block(1), Some(callback), now);
        let weights: HashMap<Account, Amount> = [(rep(1).account, Amount::raw(90))].into();

        let (added, actions) = active.apply_publish(&block(2), true, &weights, &quorum(), now);
        assert!(added);
        assert_eq!(actions.republish, vec![block(2)]);
        let (again, _) = active.apply_publish(&block(2), true, &weights, &quorum(), now);
        assert!(!again);

        let vote = Vote::for_hashes(&rep(1), 1, &[block(2).hash()]).unwrap();
        let (_, actions) = active.apply_vote(&vote, &weights, &quorum(), now);
        assert_eq!(actions.replacements, vec![block(2)]);
        let (status, callback) = &actions.confirmed[0];
        assert_eq!(status.winner, block(2));
        callback.as_ref().unwrap()(&status.winner);
        assert_eq!(callback_hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn finished_elections_retire_into_history() {
        let active = ActiveTransactions::new();
        let now = Instant::now();
        active.start(block(1), None, now);
        active.start(block_at(5, 9), None, now);
        let key = rep(1);
        let weights: HashMap<Account, Amount> = [(key.account, Amount::raw(90))].into();
        let vote = Vote::for_hashes(&key, 1, &[block(1).hash()]).unwrap();
        active.apply_vote(&vote, &weights, &quorum(), now);

        let first = active.announce_pass(&HashMap::new());
        assert_eq!(first.vote_hashes.len(), 1);
        assert_eq!(active.size(), 2);
        let second = active.announce_pass(&HashMap::new());
        assert_eq!(active.size(), 1);
        assert_eq!(second.confirm_requests.len(), 1);
        let history = active.list_confirmed();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].winner, block(1));
        assert!(!active.active_block(&block(1).hash()));
    }

    #[test]
    fn winners_that_no_longer_fit_are_stopped() {
        let active = ActiveTransactions::new();
        active.start(block(1), None, Instant::now());
        let root = block(1).root();
        let unfit: HashMap<Root, bool> = [(root, false)].into();
        for _ in 0..4 {
            assert_eq!(active.announce_pass(&unfit).stopped, 0);
        }
        assert_eq!(active.announce_pass(&unfit).stopped, 1);
        assert!(active.election(&root).unwrap().is_stopped());
        active.announce_pass(&unfit);
        assert!(!active.active(&root));
        assert!(active.list_confirmed().is_empty());

        active.start(block(1), None, Instant::now());
        let fit: HashMap<Root, bool> = [(root, true)].into();
        assert_eq!(active.announce_pass(&fit).republish, vec![block(1)]);
    }

    #[test]
    fn stopped_container_refuses_elections() {
        let active = ActiveTransactions::new();
        active.start(block(1), None, Instant::now());
        active.stop();
        assert!(active.is_empty());
        assert!(!active.start(block(1), None, Instant::now()));
    }

    #[test]
    fn erase_forgets_every_candidate() {
        let active = ActiveTransactions::new();
        let now = Instant::now();
        active.start(block(1), None, now);
        let weights: HashMap<Account, Amount> = HashMap::new();
        active.apply_publish(&block(2), true, &weights, &quorum(), now);
        active.erase(&block(2));
        assert!(!active.active(&block(1).root()));
        assert!(!active.active_block(&block(2).hash()));
    }

    #[test]
    fn interval_grows_with_elections() {
        assert_eq!(announce_interval(NetworkId::Dev, 0), Duration::from_millis(10));
        assert_eq!(announce_interval(NetworkId::Dev, 5), Duration::from_millis(110));
        assert_eq!(
            announce_interval(NetworkId::Live, 5000),
            Duration::from_secs(16) + Duration::from_secs(20)
        );
    }

}
