//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use lattice_types::NetworkId;

use crate::NodeError;

/// Configuration for a lattice node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Which network to join.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    /// Data directory for ledger storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Port the network layer listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Vote with the wallet's representatives.
    #[serde(default)]
    pub enable_voting: bool,

    /// Longest a block processor batch keeps its write transaction open.
    #[serde(default = "default_batch_max_time_ms")]
    pub block_processor_batch_max_time_ms: u64,

    /// Threads on the background executor.
    #[serde(default = "default_io_threads")]
    pub io_threads: usize,

    /// Unchecked entries older than this are discarded.
    #[serde(default = "default_unchecked_cutoff_secs")]
    pub unchecked_cutoff_secs: u64,

    /// LMDB map size in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub enable_metrics: bool,
}

fn default_network() -> NetworkId {
    NetworkId::Dev
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./lattice_data")
}

fn default_port() -> u16 {
    NetworkId::Dev.default_port()
}

fn default_batch_max_time_ms() -> u64 {
    5_000
}

fn default_io_threads() -> usize {
    4
}

fn default_unchecked_cutoff_secs() -> u64 {
    4 * 60 * 60
}

fn default_lmdb_map_size() -> usize {
    16 * 1024 * 1024 * 1024
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NodeConfig {
    /// Defaults for `network`, with the port matching it.
    pub fn for_network(network: NetworkId) -> Self {
        Self {
            network,
            port: network.default_port(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn block_processor_batch_max_time(&self) -> Duration {
        Duration::from_millis(self.block_processor_batch_max_time_ms)
    }

    pub fn unchecked_cutoff(&self) -> Duration {
        Duration::from_secs(self.unchecked_cutoff_secs)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            data_dir: default_data_dir(),
            port: default_port(),
            enable_voting: false,
            block_processor_batch_max_time_ms: default_batch_max_time_ms(),
            io_threads: default_io_threads(),
            unchecked_cutoff_secs: default_unchecked_cutoff_secs(),
            lmdb_map_size: default_lmdb_map_size(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}
