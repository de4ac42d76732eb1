//! Prometheus metrics for the node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] covering the block and
//! vote pipelines and elections; [`NodeMetrics::encode`] renders it in the
//! Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::NodeError;

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Ledger results of processed blocks, labelled by result code.
    pub blocks_processed: IntCounterVec,
    /// Blocks dropped before reaching the ledger, labelled by reason.
    pub blocks_dropped: IntCounterVec,
    /// Vote processing outcomes, labelled `vote`, `replay` or `invalid`.
    pub votes_processed: IntCounterVec,
    pub votes_generated: IntCounter,
    pub elections_started: IntCounter,
    pub elections_confirmed: IntCounter,
    pub elections_stopped: IntCounter,
    pub rollbacks: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub block_count: IntGauge,
    pub unchecked_count: IntGauge,
    pub active_elections: IntGauge,
    pub block_queue: IntGauge,
    pub vote_queue: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    pub election_duration_ms: Histogram,
    pub block_batch_time_ms: Histogram,
}

impl NodeMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let blocks_processed = register_int_counter_vec_with_registry!(
            Opts::new("lattice_blocks_processed_total", "Blocks processed by the ledger"),
            &["result"],
            registry
        )?;
        let blocks_dropped = register_int_counter_vec_with_registry!(
            Opts::new("lattice_blocks_dropped_total", "Blocks dropped before processing"),
            &["reason"],
            registry
        )?;
        let votes_processed = register_int_counter_vec_with_registry!(
            Opts::new("lattice_votes_processed_total", "Votes processed"),
            &["code"],
            registry
        )?;
        let votes_generated = register_int_counter_with_registry!(
            Opts::new("lattice_votes_generated_total", "Votes generated by local representatives"),
            registry
        )?;
        let elections_started = register_int_counter_with_registry!(
            Opts::new("lattice_elections_started_total", "Elections started"),
            registry
        )?;
        let elections_confirmed = register_int_counter_with_registry!(
            Opts::new("lattice_elections_confirmed_total", "Elections confirmed"),
            registry
        )?;
        let elections_stopped = register_int_counter_with_registry!(
            Opts::new("lattice_elections_stopped_total", "Elections abandoned"),
            registry
        )?;
        let rollbacks = register_int_counter_with_registry!(
            Opts::new("lattice_rollbacks_total", "Blocks rolled back to make way for a winner"),
            registry
        )?;

        let block_count = register_int_gauge_with_registry!(
            Opts::new("lattice_block_count", "Blocks in the ledger"),
            registry
        )?;
        let unchecked_count = register_int_gauge_with_registry!(
            Opts::new("lattice_unchecked_count", "Blocks waiting on a dependency"),
            registry
        )?;
        let active_elections = register_int_gauge_with_registry!(
            Opts::new("lattice_active_elections", "Elections in progress"),
            registry
        )?;
        let block_queue = register_int_gauge_with_registry!(
            Opts::new("lattice_block_queue", "Blocks queued for processing"),
            registry
        )?;
        let vote_queue = register_int_gauge_with_registry!(
            Opts::new("lattice_vote_queue", "Votes queued for processing"),
            registry
        )?;

        // 1 ms to ~16 s
        let election_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new("lattice_election_duration_ms", "Election duration in milliseconds")
                .buckets(prometheus::exponential_buckets(1.0, 2.0, 15)?),
            registry
        )?;
        let block_batch_time_ms = register_histogram_with_registry!(
            HistogramOpts::new("lattice_block_batch_time_ms", "Block processor batch time in milliseconds")
                .buckets(prometheus::exponential_buckets(0.1, 2.0, 15)?),
            registry
        )?;

        Ok(Self {
            registry,
            blocks_processed,
            blocks_dropped,
            votes_processed,
            votes_generated,
            elections_started,
            elections_confirmed,
            elections_stopped,
            rollbacks,
            block_count,
            unchecked_count,
            active_elections,
            block_queue,
            vote_queue,
            election_duration_ms,
            block_batch_time_ms,
        })
    }

    /// Text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
