//! The node: owns every component and wires them together.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use lattice_consensus::gap_cache::{BOOTSTRAP_DELAY_DEV, BOOTSTRAP_DELAY_LIVE};
use lattice_consensus::online_reps::{CUTOFF_DEV, CUTOFF_LIVE};
use lattice_consensus::{BlockArrival, ElectionStatus, GapCache, OnlineReps, Quorum, RepCrawler, Vote};
use lattice_ledger::{Block, Ledger, NetworkParams, ProcessReturn};
use lattice_store::{AccountStore, Store, Transaction, UncheckedStore};
use lattice_types::{Account, Amount, BlockHash};
use lattice_work::WorkPool;
use rand::Rng;
use tokio::runtime::{Handle, Runtime};

use crate::active_transactions::{ActiveTransactions, ConfirmationCallback, ElectionActions};
use crate::block_processor::{unchecked_cleanup, BlockProcessor};
use crate::metrics::NodeMetrics;
use crate::network::Network;
use crate::shutdown::ShutdownController;
use crate::vote_generator::VoteGenerator;
use crate::vote_processor::VoteProcessor;
use crate::wallets::Wallets;
use crate::{EventBus, NodeConfig, NodeError, NodeEvent};

/// How often a confirmed block that is not yet in the ledger is looked for again.
const PROCESS_CONFIRMED_ATTEMPTS: u32 = 16;
/// Peers asked per representative crawl.
const REP_CRAWL_PEERS: usize = 8;
/// How long a crawl query stays open for responses.
const REP_QUERY_TIMEOUT: Duration = Duration::from_secs(5);
const UNCHECKED_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);
const LEDGER_STATS_INTERVAL: Duration = Duration::from_secs(60);

/// A running node.
///
/// Pipelines (blocks, votes, vote generation, election announcements) each
/// run on a dedicated thread; timers and confirmation callbacks run on the
/// node's own tokio runtime.
pub struct Node {
    pub config: NodeConfig,
    pub params: NetworkParams,
    pub store: Arc<dyn Store>,
    pub ledger: Ledger,
    pub network: Arc<dyn Network>,
    pub wallets: Arc<dyn Wallets>,
    pub work: Arc<WorkPool>,
    pub block_processor: BlockProcessor,
    pub vote_processor: VoteProcessor,
    pub vote_generator: VoteGenerator,
    pub active: ActiveTransactions,
    pub metrics: NodeMetrics,
    pub events: EventBus,
    online_reps: Mutex<OnlineReps>,
    gap_cache: Mutex<GapCache>,
    rep_crawler: Mutex<RepCrawler>,
    block_arrival: Mutex<BlockArrival>,
    shutdown: ShutdownController,
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    threads: Mutex<Vec<JoinHandle<()>>>,
    stopped: AtomicBool,
    this: Weak<Node>,
}

impl Node {
    /// Build a node over `store`, initializing the ledger with the network's
    /// genesis if the store is empty. Nothing runs until [`start`](Self::start).
    pub fn new(
        config: NodeConfig,
        params: NetworkParams,
        store: Arc<dyn Store>,
        network: Arc<dyn Network>,
        wallets: Arc<dyn Wallets>,
    ) -> Result<Arc<Self>, NodeError> {
        let ledger = Ledger::new(Arc::clone(&store), params.clone())?;
        let metrics = NodeMetrics::new()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.io_threads.max(1))
            .thread_name("lattice-io")
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();
        let work = Arc::new(WorkPool::new(params.work));
        let cutoff = if params.network.is_dev() { CUTOFF_DEV } else { CUTOFF_LIVE };

        tracing::info!(
            network = params.network.as_str(),
            genesis = %params.genesis_hash(),
            blocks = ledger.block_count(),
            voting = config.enable_voting,
            "node initialized"
        );

        Ok(Arc::new_cyclic(|this| Node {
            block_processor: BlockProcessor::new(
                params.work,
                params.epoch_link,
                config.block_processor_batch_max_time(),
                Arc::clone(&work),
            ),
            vote_processor: VoteProcessor::new(),
            vote_generator: VoteGenerator::new(),
            active: ActiveTransactions::new(),
            online_reps: Mutex::new(OnlineReps::new(cutoff, params.online_weight_minimum)),
            gap_cache: Mutex::new(GapCache::new()),
            rep_crawler: Mutex::new(RepCrawler::new()),
            block_arrival: Mutex::new(BlockArrival::new()),
            events: EventBus::new(),
            shutdown: ShutdownController::new(),
            runtime: Mutex::new(Some(runtime)),
            handle,
            threads: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
            this: this.clone(),
            config,
            params,
            store,
            ledger,
            network,
            wallets,
            work,
            metrics,
        }))
    }

    /// Spawn the pipeline threads and periodic tasks.
    pub fn start(self: &Arc<Self>) -> Result<(), NodeError> {
        let mut threads = lock(&self.threads);
        threads.push(self.spawn_thread("block processing", |node| node.block_processor.run(node))?);
        threads.push(self.spawn_thread("vote processing", |node| node.vote_processor.run(node))?);
        threads.push(self.spawn_thread("request loop", |node| node.active.run(node))?);
        threads.push(self.spawn_thread("voting", |node| node.vote_generator.run(node))?);
        drop(threads);

        let dev = self.params.network.is_dev();
        self.spawn_periodic(
            if dev { Duration::from_millis(500) } else { Duration::from_secs(300) },
            |node| node.recalculate_online_stake(),
        );
        self.spawn_periodic(
            if dev { Duration::from_millis(500) } else { Duration::from_secs(4) },
            |node| node.rep_crawl(),
        );
        self.spawn_periodic(UNCHECKED_CLEANUP_INTERVAL, |node| node.cleanup_unchecked());
        self.spawn_periodic(LEDGER_STATS_INTERVAL, |node| node.log_ledger_stats());

        tracing::info!(threads = 4, "node started");
        Ok(())
    }

    fn spawn_thread(
        self: &Arc<Self>,
        name: &str,
        body: impl FnOnce(&Node) + Send + 'static,
    ) -> Result<JoinHandle<()>, NodeError> {
        let node = Arc::clone(self);
        Ok(std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(&*node))?)
    }

    /// Run `tick` every `period` until shutdown. The task holds the node
    /// weakly so a dropped node ends it.
    fn spawn_periodic(self: &Arc<Self>, period: Duration, tick: impl Fn(&Node) + Send + Sync + 'static) {
        let weak = Arc::downgrade(self);
        let mut shutdown_rx = self.shutdown.subscribe();
        let tick = Arc::new(tick);
        self.handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = interval.tick() => {
                        let Some(node) = weak.upgrade() else { break };
                        let tick = Arc::clone(&tick);
                        if tokio::task::spawn_blocking(move || tick(&*node)).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Stop every component and wait for the pipeline threads. Idempotent.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("node stopping");
        self.block_processor.stop();
        self.active.stop();
        self.network.stop();
        self.vote_processor.stop();
        self.vote_generator.stop();
        self.wallets.stop();
        self.shutdown.shutdown();
        if let Some(runtime) = lock(&self.runtime).take() {
            runtime.shutdown_background();
        }

        let current = std::thread::current().id();
        let threads: Vec<JoinHandle<()>> = lock(&self.threads).drain(..).collect();
        for thread in threads {
            if thread.thread().id() != current && thread.join().is_err() {
                tracing::error!("pipeline thread panicked");
            }
        }
        tracing::info!("node stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Queue a block that just arrived from the network or a wallet.
    /// Returns false for a block that already arrived recently.
    pub fn process_active(&self, block: Block) -> bool {
        let now = Instant::now();
        if lock(&self.block_arrival).add(block.hash(), now) {
            return false;
        }
        self.block_processor.add(block, now)
    }

    /// Apply `block` to the ledger right away in its own transaction.
    pub fn process(&self, block: &Block) -> Result<ProcessReturn, NodeError> {
        let mut txn = self.store.tx_begin_write()?;
        let result = self.ledger.process(txn.as_mut(), block)?;
        txn.commit()?;
        tracing::debug!(block_hash = %block.hash(), result = %result.code, "processed block");
        Ok(result)
    }

    /// Process a block and offer it to any election on its root.
    pub fn publish(&self, block: Block) -> bool {
        let queued = self.process_active(block.clone());
        self.active.publish(self, &block);
        queued
    }

    /// `block` competes with the block the ledger holds at its root. Opens
    /// an election on the ledger's block and offers `block` to it.
    pub fn process_fork(&self, txn: &dyn Transaction, block: &Block) -> Result<(), NodeError> {
        let hash = block.hash();
        if self.ledger.block_exists(txn, &hash)? {
            return Ok(());
        }
        let Some(ledger_block) = self.ledger.forked_block(txn, block)? else {
            return Ok(());
        };
        if self.start_election(ledger_block.clone(), None) {
            tracing::info!(
                root = %block.root(),
                ledger = %ledger_block.hash(),
                incoming = %hash,
                "resolving fork"
            );
            self.events.emit(&NodeEvent::ForkDetected {
                root: block.root(),
                ledger: ledger_block.hash(),
                incoming: hash,
            });
            self.network.broadcast_confirm_req(&ledger_block);
        }
        let fits = self.ledger.could_fit(txn, block)?;
        let quorum = self.quorum();
        let (_, actions) = self.active.apply_publish(block, fits, &self.ledger, &quorum, Instant::now());
        self.dispatch(actions);
        Ok(())
    }

    /// Open an election for `block` unless its root already has one.
    pub fn start_election(&self, block: Block, callback: Option<ConfirmationCallback>) -> bool {
        let started = self.active.start(block, callback, Instant::now());
        if started {
            self.metrics.elections_started.inc();
            self.metrics.active_elections.set(self.active.size() as i64);
        }
        started
    }

    /// Carry out what elections decided. Never opens a store transaction,
    /// so it is safe to call while one is held.
    pub fn dispatch(&self, actions: ElectionActions) {
        for block in actions.replacements {
            tracing::info!(block_hash = %block.hash(), "election leader changed, replacing ledger block");
            self.block_processor.force(block);
        }
        for (status, callback) in actions.confirmed {
            self.election_confirmed(status, callback);
        }
        for block in &actions.republish {
            self.network.republish_block(block);
        }
    }

    fn election_confirmed(&self, status: ElectionStatus, callback: Option<ConfirmationCallback>) {
        let hash = status.winner.hash();
        let duration_ms = status.election_duration.as_millis() as u64;
        self.metrics.elections_confirmed.inc();
        self.metrics.election_duration_ms.observe(duration_ms as f64);
        tracing::info!(block_hash = %hash, tally = %status.tally, duration_ms, "election confirmed");
        self.events.emit(&NodeEvent::ElectionConfirmed(status.clone()));

        let Some(node) = self.this.upgrade() else {
            return;
        };
        self.handle.spawn_blocking(move || {
            node.process_confirmed(&status.winner);
            if let Some(callback) = callback {
                callback(&status.winner);
            }
        });
    }

    /// Act on a confirmed block: hand sends to local destinations to the
    /// wallet and tell local accounts about a new dividend. Waits for the
    /// block to reach the ledger if it has not yet.
    pub fn process_confirmed(&self, block: &Block) {
        let retry = if self.params.network.is_dev() {
            Duration::from_millis(50)
        } else {
            Duration::from_millis(500)
        };
        for _ in 0..PROCESS_CONFIRMED_ATTEMPTS {
            match self.try_process_confirmed(block) {
                Ok(true) => return,
                Ok(false) if !self.is_stopped() => std::thread::sleep(retry),
                Ok(false) => return,
                Err(e) => {
                    tracing::error!(block_hash = %block.hash(), error = %e, "cannot process confirmed block");
                    return;
                }
            }
        }
        tracing::warn!(block_hash = %block.hash(), "confirmed block never reached the ledger");
    }

    fn try_process_confirmed(&self, block: &Block) -> Result<bool, NodeError> {
        let hash = block.hash();
        let mut receive = None;
        let mut claims = Vec::new();
        {
            let txn = self.store.tx_begin_read()?;
            let txn = txn.as_ref();
            if !self.ledger.block_exists(txn, &hash)? {
                return Ok(false);
            }
            if self.ledger.is_send(txn, block)? {
                let destination = self.ledger.block_destination(txn, block)?;
                if self.wallets.exists(&destination) {
                    receive = Some(destination);
                }
            }
            if let Block::Dividend(_) = block {
                for account in self.wallets.accounts() {
                    if let Some((dividend, share)) = self.ledger.next_claim(txn, &account)? {
                        if dividend == hash && !share.is_zero() {
                            claims.push(account);
                        }
                    }
                }
            }
        }
        if let Some(destination) = receive {
            tracing::debug!(block_hash = %hash, destination = %destination, "receiving confirmed send");
            self.wallets.receive_confirmed(block, &destination);
        }
        for account in claims {
            tracing::debug!(dividend = %hash, account = %account, "claiming dividend");
            self.wallets.claim_dividend(&account, &hash);
        }
        Ok(true)
    }

    /// Queue a vote received from `endpoint`.
    pub fn vote(&self, vote: Vote, endpoint: SocketAddr) -> bool {
        self.vote_processor.add(self, vote, endpoint)
    }

    pub fn quorum(&self) -> Quorum {
        Quorum::new(
            self.online_stake(),
            self.params.online_weight_minimum,
            self.params.online_weight_quorum,
            self.params.network.is_dev(),
        )
    }

    /// Lead a block needs over the runner-up to confirm.
    pub fn delta(&self) -> Amount {
        self.quorum().delta
    }

    pub fn online_stake(&self) -> Amount {
        lock(&self.online_reps).online_stake()
    }

    /// Wait until every queued block has been processed.
    pub fn flush(&self) {
        self.block_processor.flush();
    }

    pub fn online_reps_lock(&self) -> MutexGuard<'_, OnlineReps> {
        lock(&self.online_reps)
    }

    pub fn gap_cache_lock(&self) -> MutexGuard<'_, GapCache> {
        lock(&self.gap_cache)
    }

    pub fn rep_crawler_lock(&self) -> MutexGuard<'_, RepCrawler> {
        lock(&self.rep_crawler)
    }

    pub fn block_arrival_lock(&self) -> MutexGuard<'_, BlockArrival> {
        lock(&self.block_arrival)
    }

    /// Enough weight voted for `hash`, which we lack. If it is still
    /// missing after the bootstrap delay, ask for a bootstrap.
    pub fn bootstrap_check(&self, hash: BlockHash) {
        let Some(node) = self.this.upgrade() else {
            return;
        };
        let delay = if self.params.network.is_dev() {
            BOOTSTRAP_DELAY_DEV
        } else {
            BOOTSTRAP_DELAY_LIVE
        };
        self.handle.spawn_blocking(move || {
            std::thread::sleep(delay);
            let exists = node
                .store
                .tx_begin_read()
                .map_err(NodeError::from)
                .and_then(|txn| Ok(node.ledger.block_exists(txn.as_ref(), &hash)?));
            match exists {
                Ok(false) => {
                    tracing::info!(block_hash = %hash, "missing block has enough votes, bootstrap required");
                    node.events.emit(&NodeEvent::BootstrapRequired { hash });
                }
                Ok(true) => {}
                Err(e) => tracing::error!(block_hash = %hash, error = %e, "bootstrap check failed"),
            }
        });
    }

    fn recalculate_online_stake(&self) {
        let mut online_reps = lock(&self.online_reps);
        online_reps.recalculate_stake(&self.ledger, Instant::now());
        tracing::trace!(online_stake = %online_reps.online_stake(), reps = online_reps.len(), "online stake");
    }

    /// Ask a few peers to vote on a random ledger block; whoever answers
    /// with a vote is recorded as speaking for that representative.
    fn rep_crawl(&self) {
        let now = Instant::now();
        let cutoff = if self.params.network.is_dev() { CUTOFF_DEV } else { CUTOFF_LIVE };
        lock(&self.rep_crawler).cleanup(cutoff, now);

        let peers = self.network.random_peers(REP_CRAWL_PEERS);
        if peers.is_empty() {
            return;
        }
        let block = match self.random_block() {
            Ok(Some(block)) => block,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "rep crawl cannot pick a block");
                return;
            }
        };
        let hash = block.hash();
        lock(&self.rep_crawler).add(hash);
        for peer in &peers {
            self.network.send_confirm_req(*peer, &block);
        }
        tracing::trace!(block_hash = %hash, peers = peers.len(), "rep crawl");

        let Some(node) = self.this.upgrade() else {
            return;
        };
        self.handle.spawn(async move {
            tokio::time::sleep(REP_QUERY_TIMEOUT).await;
            node.rep_crawler_lock().remove(&hash);
        });
    }

    /// Head block of a random account.
    fn random_block(&self) -> Result<Option<Block>, NodeError> {
        let txn = self.store.tx_begin_read()?;
        let txn = txn.as_ref();
        let start = Account::new(rand::thread_rng().gen());
        let mut accounts = txn.accounts_from(&start, 1)?;
        if accounts.is_empty() {
            accounts = txn.accounts_from(&Account::ZERO, 1)?;
        }
        match accounts.first() {
            Some((_, info)) => Ok(self.ledger.get_block(txn, &info.head)?),
            None => Ok(None),
        }
    }

    fn cleanup_unchecked(&self) {
        let result = self.store.tx_begin_write().map_err(NodeError::from).and_then(|mut txn| {
            let removed = unchecked_cleanup(txn.as_mut(), self.config.unchecked_cutoff())?;
            txn.commit()?;
            Ok(removed)
        });
        match result {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "cleaned expired unchecked entries"),
            Err(e) => tracing::error!(error = %e, "unchecked cleanup failed"),
        }
    }

    fn log_ledger_stats(&self) {
        let unchecked = match self.store.tx_begin_read() {
            Ok(txn) => txn.unchecked_count().unwrap_or(0),
            Err(_) => 0,
        };
        let blocks = self.ledger.block_count();
        self.metrics.block_count.set(blocks as i64);
        self.metrics.unchecked_count.set(unchecked as i64);
        self.metrics.active_elections.set(self.active.size() as i64);
        let (online_stake, online_total) = {
            let online_reps = lock(&self.online_reps);
            (online_reps.online_stake(), online_reps.online_total())
        };
        tracing::info!(
            blocks,
            unchecked,
            elections = self.active.size(),
            online_stake = %online_stake,
            online_total = %online_total,
            block_queue = self.block_processor.size(),
            vote_queue = self.vote_processor.size(),
            "ledger stats"
        );
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if let Some(runtime) = lock(&self.runtime).take() {
            runtime.shutdown_background();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
