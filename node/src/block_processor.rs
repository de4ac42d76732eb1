//! Block processing pipeline.
//!
//! Blocks arrive from many threads and are applied by one worker in batches
//! under a single write transaction. Non-epoch state blocks first pass a
//! batched signature check. Forced blocks (election winners) go ahead of
//! everything else and replace whatever the ledger holds at their root.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lattice_crypto::verify_batch;
use lattice_ledger::{Block, ProcessResult, ProcessReturn, SignatureVerification};
use lattice_store::{Transaction, UncheckedKey, UncheckedStore, UncheckedStoreMut, WriteTransaction};
use lattice_types::{Account, BlockHash, Link, Signature, Timestamp};
use lattice_work::{work_validate, WorkPool, WorkThresholds};
use serde::{Deserialize, Serialize};

use crate::node::Node;
use crate::NodeError;

/// Queue length past which the processor reports itself full.
pub const BLOCK_PROCESSOR_FULL: usize = 16_384;

/// Forks older than this did not arrive live and go to fork resolution.
const FORK_AGE: Duration = Duration::from_secs(15);

/// A block parked until the block it depends on arrives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncheckedInfo {
    pub block: Block,
    pub arrival: Timestamp,
    pub verified: SignatureVerification,
}

impl UncheckedInfo {
    pub fn new(block: Block, verified: SignatureVerification) -> Self {
        Self {
            block,
            arrival: Timestamp::now(),
            verified,
        }
    }
}

struct QueuedBlock {
    block: Block,
    origination: Instant,
    verified: SignatureVerification,
}

#[derive(Default)]
struct Queues {
    blocks: VecDeque<QueuedBlock>,
    forced: VecDeque<Block>,
    state_blocks: VecDeque<QueuedBlock>,
    /// Hashes in `blocks` or `state_blocks`.
    hashes: HashSet<BlockHash>,
    stopped: bool,
    active: bool,
}

impl Queues {
    fn have_blocks(&self) -> bool {
        !self.blocks.is_empty() || !self.forced.is_empty() || !self.state_blocks.is_empty()
    }

    fn len(&self) -> usize {
        self.blocks.len() + self.forced.len() + self.state_blocks.len()
    }
}

pub struct BlockProcessor {
    queues: Mutex<Queues>,
    condition: Condvar,
    thresholds: WorkThresholds,
    epoch_link: Link,
    batch_max_time: Duration,
    work: Arc<WorkPool>,
}

impl BlockProcessor {
    pub fn new(thresholds: WorkThresholds, epoch_link: Link, batch_max_time: Duration, work: Arc<WorkPool>) -> Self {
        Self {
            queues: Mutex::new(Queues::default()),
            condition: Condvar::new(),
            thresholds,
            epoch_link,
            batch_max_time,
            work,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a block that arrived at `origination`. Blocks with insufficient
    /// work and blocks already queued are dropped; returns whether it was
    /// queued.
    pub fn add(&self, block: Block, origination: Instant) -> bool {
        if !work_validate(&block.root(), block.work(), self.thresholds.publish) {
            tracing::warn!(block_hash = %block.hash(), "dropping block with insufficient work");
            return false;
        }
        self.enqueue(QueuedBlock {
            block,
            origination,
            verified: SignatureVerification::Unknown,
        })
    }

    fn enqueue(&self, item: QueuedBlock) -> bool {
        let mut queues = self.lock();
        if queues.stopped || !queues.hashes.insert(item.block.hash()) {
            return false;
        }
        // Account-signed state-era blocks go through batch verification;
        // epoch blocks are signed by the epoch key and checked by the ledger.
        let needs_signature_check = item.verified == SignatureVerification::Unknown
            && match &item.block {
                Block::State(b) => b.link != self.epoch_link,
                Block::Dividend(_) | Block::Claim(_) => true,
                _ => false,
            };
        if needs_signature_check {
            queues.state_blocks.push_back(item);
        } else {
            queues.blocks.push_back(item);
        }
        drop(queues);
        self.condition.notify_all();
        true
    }

    /// Queue an election winner, replacing the ledger's block at its root.
    pub fn force(&self, block: Block) {
        let mut queues = self.lock();
        if queues.stopped {
            return;
        }
        queues.forced.push_back(block);
        drop(queues);
        self.condition.notify_all();
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    pub fn full(&self) -> bool {
        self.size() > BLOCK_PROCESSOR_FULL
    }

    /// Block until every queued block has been processed.
    pub fn flush(&self) {
        let mut queues = self.lock();
        while !queues.stopped && (queues.have_blocks() || queues.active) {
            queues = self.condition.wait(queues).unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn stop(&self) {
        self.lock().stopped = true;
        self.condition.notify_all();
        self.work.stop();
    }

    /// Worker loop; returns when stopped.
    pub fn run(&self, node: &Node) {
        let mut queues = self.lock();
        while !queues.stopped {
            if queues.have_blocks() {
                queues.active = true;
                drop(queues);
                self.process_batch(node);
                queues = self.lock();
                queues.active = false;
            } else {
                self.condition.notify_all();
                queues = self.condition.wait(queues).unwrap_or_else(PoisonError::into_inner);
            }
        }
    }

    fn verify_state_blocks(&self, node: &Node) {
        let batch: Vec<QueuedBlock> = self.lock().state_blocks.drain(..).collect();
        if batch.is_empty() {
            return;
        }
        let hashes: Vec<BlockHash> = batch.iter().map(|item| item.block.hash()).collect();
        let messages: Vec<&[u8]> = hashes.iter().map(|h| &h.as_bytes()[..]).collect();
        let signatures: Vec<Signature> = batch.iter().map(|item| *item.block.signature()).collect();
        let accounts: Vec<Account> = batch
            .iter()
            .map(|item| item.block.account().unwrap_or_default())
            .collect();
        let verdicts = verify_batch(&messages, &signatures, &accounts);

        let mut queues = self.lock();
        for ((mut item, hash), valid) in batch.into_iter().zip(hashes).zip(verdicts) {
            if valid {
                item.verified = SignatureVerification::Valid;
                queues.blocks.push_back(item);
            } else {
                queues.hashes.remove(&hash);
                node.metrics.blocks_dropped.with_label_values(&["bad_signature"]).inc();
                tracing::debug!(block_hash = %hash, "dropping block with bad signature");
            }
        }
    }

    fn process_batch(&self, node: &Node) {
        let started = Instant::now();
        self.verify_state_blocks(node);

        let mut txn = match node.store.tx_begin_write() {
            Ok(txn) => txn,
            Err(e) => {
                tracing::error!(error = %e, "cannot open write transaction for block batch");
                return;
            }
        };
        let mut count = 0usize;
        loop {
            let next = {
                let mut queues = self.lock();
                if count > 0 && started.elapsed() >= self.batch_max_time {
                    None
                } else if let Some(block) = queues.forced.pop_front() {
                    Some((
                        QueuedBlock {
                            block,
                            origination: Instant::now(),
                            verified: SignatureVerification::Unknown,
                        },
                        true,
                    ))
                } else if let Some(item) = queues.blocks.pop_front() {
                    queues.hashes.remove(&item.block.hash());
                    Some((item, false))
                } else {
                    None
                }
            };
            let Some((item, forced)) = next else {
                break;
            };
            if forced {
                self.replace_competitor(node, txn.as_mut(), &item.block);
            }
            if let Err(e) = self.process_one(node, txn.as_mut(), &item.block, item.origination, item.verified) {
                tracing::error!(block_hash = %item.block.hash(), error = %e, "block processing failed");
            }
            count += 1;
        }
        if let Err(e) = txn.commit() {
            tracing::error!(error = %e, "block batch commit failed");
            if let Err(e) = node.ledger.reload_caches() {
                tracing::error!(error = %e, "cannot reload ledger caches");
            }
        }

        let elapsed = started.elapsed();
        node.metrics.block_batch_time_ms.observe(elapsed.as_secs_f64() * 1000.0);
        node.metrics.block_count.set(node.ledger.block_count() as i64);
        node.metrics.block_queue.set(self.size() as i64);
        if count > 0 {
            tracing::debug!(count, elapsed_ms = elapsed.as_millis() as u64, "processed block batch");
        }
    }

    /// Roll back the ledger's block at `block`'s root if it differs.
    fn replace_competitor(&self, node: &Node, txn: &mut dyn WriteTransaction, block: &Block) {
        let hash = block.hash();
        let successor = match node.ledger.successor(txn.as_read(), &block.root()) {
            Ok(Some(successor)) if successor.hash() != hash => successor,
            Ok(_) => return,
            Err(e) => {
                tracing::error!(block_hash = %hash, error = %e, "cannot look up competitor");
                return;
            }
        };
        let successor_hash = successor.hash();
        tracing::info!(rolled_back = %successor_hash, replacement = %hash, "replacing block with election winner");
        match node.ledger.rollback(txn, &successor_hash) {
            Ok(removed) => {
                node.metrics.rollbacks.inc_by(removed.len() as u64);
                tracing::info!(count = removed.len(), "blocks rolled back");
                for removed in removed.iter().filter(|b| b.hash() != successor_hash) {
                    node.active.erase(removed);
                }
            }
            Err(e) => tracing::error!(block_hash = %successor_hash, error = %e, "rollback failed"),
        }
    }

    /// Apply one block inside `txn` and act on the result.
    pub fn process_one(
        &self,
        node: &Node,
        txn: &mut dyn WriteTransaction,
        block: &Block,
        origination: Instant,
        verified: SignatureVerification,
    ) -> Result<ProcessReturn, NodeError> {
        let hash = block.hash();
        let result = node.ledger.process_verified(txn, block, verified)?;
        node.metrics
            .blocks_processed
            .with_label_values(&[result.code.as_str()])
            .inc();
        node.events.emit(&crate::NodeEvent::BlockProcessed {
            hash,
            result: result.code,
        });
        match result.code {
            ProcessResult::Progress => {
                tracing::debug!(block_hash = %hash, account = %result.account, amount = %result.amount, "block applied");
                if node.block_arrival_lock().recent(&hash, Instant::now()) {
                    node.start_election(block.clone(), None);
                    if node.config.enable_voting {
                        node.vote_generator.add(hash);
                    }
                }
                self.queue_unchecked(txn, &hash)?;
                node.gap_cache_lock().erase(&hash);
            }
            ProcessResult::GapPrevious => {
                tracing::trace!(block_hash = %hash, previous = %block.previous(), "gap previous");
                let key = UncheckedKey::new(block.previous(), hash);
                txn.unchecked_put(&key, &UncheckedInfo::new(block.clone(), result.verified))?;
                node.gap_cache_lock().add(hash, Instant::now());
            }
            ProcessResult::GapSource => {
                let dependency = gap_source_dependency(block);
                tracing::trace!(block_hash = %hash, source = %dependency, "gap source");
                let key = UncheckedKey::new(dependency, hash);
                txn.unchecked_put(&key, &UncheckedInfo::new(block.clone(), result.verified))?;
                node.gap_cache_lock().add(hash, Instant::now());
            }
            ProcessResult::Old => {
                tracing::trace!(block_hash = %hash, "old block");
                self.queue_unchecked(txn, &hash)?;
            }
            ProcessResult::Fork => {
                if origination.elapsed() > FORK_AGE {
                    node.process_fork(txn.as_read(), block)?;
                } else {
                    tracing::debug!(block_hash = %hash, root = %block.root(), "fork");
                }
            }
            other => {
                tracing::debug!(block_hash = %hash, result = %other, "block rejected");
            }
        }
        Ok(result)
    }

    /// Requeue every block that was waiting on `hash`.
    fn queue_unchecked(&self, txn: &mut dyn WriteTransaction, hash: &BlockHash) -> Result<(), NodeError> {
        let waiting: Vec<(UncheckedKey, UncheckedInfo)> = txn.unchecked_get(hash)?;
        for (key, info) in waiting {
            txn.unchecked_del(&key)?;
            let age = Duration::from_secs(info.arrival.elapsed_since(Timestamp::now()));
            let now = Instant::now();
            self.enqueue(QueuedBlock {
                block: info.block,
                origination: now.checked_sub(age).unwrap_or(now),
                verified: info.verified,
            });
        }
        Ok(())
    }
}

/// The missing dependency behind a gap-source result.
fn gap_source_dependency(block: &Block) -> BlockHash {
    match block {
        Block::State(b) => b.link.as_block_hash(),
        Block::Claim(b) => b.dividend,
        _ => block.source().unwrap_or_default(),
    }
}

/// Drop unchecked entries older than `cutoff`. Returns how many were removed.
pub fn unchecked_cleanup(txn: &mut dyn WriteTransaction, cutoff: Duration) -> Result<usize, NodeError> {
    let now = Timestamp::now();
    let all: Vec<(UncheckedKey, UncheckedInfo)> = txn.unchecked_all()?;
    let mut removed = 0;
    for (key, info) in all {
        if info.arrival.elapsed_since(now) > cutoff.as_secs() {
            txn.unchecked_del(&key)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Number of entries parked in the unchecked table.
pub fn unchecked_count(txn: &dyn Transaction) -> Result<u64, NodeError> {
    Ok(txn.unchecked_count()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_ledger::{ClaimBlock, NetworkParams};
    use lattice_nullables::NullStore;
    use lattice_store::Store;
    use lattice_types::Amount;

    #[test]
    fn gap_source_points_at_the_missing_block() {
        let claim = Block::Claim(ClaimBlock {
            account: Account::from_u64(1),
            previous: BlockHash::from_u64(2),
            representative: Account::from_u64(3),
            balance: Amount::raw(4),
            dividend: BlockHash::from_u64(5),
            signature: Signature::default(),
            work: 0,
        });
        assert_eq!(gap_source_dependency(&claim), BlockHash::from_u64(5));
    }

    #[test]
    fn cleanup_keeps_fresh_entries() {
        let store = NullStore::new();
        let genesis = NetworkParams::dev().genesis_block;
        let mut txn = store.tx_begin_write().unwrap();
        let fresh = UncheckedInfo::new(genesis.clone(), SignatureVerification::Unknown);
        let stale = UncheckedInfo {
            arrival: Timestamp::new(1),
            ..fresh.clone()
        };
        txn.unchecked_put(&UncheckedKey::new(BlockHash::from_u64(1), genesis.hash()), &fresh)
            .unwrap();
        txn.unchecked_put(&UncheckedKey::new(BlockHash::from_u64(2), genesis.hash()), &stale)
            .unwrap();
        assert_eq!(unchecked_cleanup(txn.as_mut(), Duration::from_secs(60)).unwrap(), 1);
        assert_eq!(unchecked_count(txn.as_read()).unwrap(), 1);
    }
}
