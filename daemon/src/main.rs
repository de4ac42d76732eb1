//! Lattice daemon: entry point for running a lattice node.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use lattice_crypto::encode_account;
use lattice_ledger::{Ledger, NetworkParams};
use lattice_node::{
    init_logging, unchecked_count, LogFormat, Node, NodeConfig, NullNetwork, NullWallets,
    ShutdownController,
};
use lattice_store::{AccountStore, Store};
use lattice_store_lmdb::LmdbStore;
use lattice_types::{Account, NetworkId};

/// How often the metrics text file is rewritten.
const METRICS_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Parser)]
#[command(name = "lattice_node", about = "Block-lattice node daemon")]
struct Cli {
    /// Network to join: "live", "test" or "dev".
    /// When a config file is provided, defaults to the file's network value.
    #[arg(long, env = "LATTICE_NETWORK")]
    network: Option<NetworkId>,

    /// Data directory for ledger storage.
    #[arg(long, env = "LATTICE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Port for the network layer (defaults to the network default).
    #[arg(long, env = "LATTICE_PORT")]
    port: Option<u16>,

    /// Vote with the wallet's representatives.
    #[arg(long, env = "LATTICE_ENABLE_VOTING")]
    enable_voting: bool,

    /// Write Prometheus metrics to `<data_dir>/metrics.prom`.
    #[arg(long, env = "LATTICE_ENABLE_METRICS")]
    metrics: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "LATTICE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "LATTICE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Node operations.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT or SIGTERM.
    Run,
    /// Print ledger statistics as JSON and exit.
    Info,
}

impl Cli {
    /// File settings (or defaults for the chosen network), overridden by
    /// whatever was given on the command line or in the environment.
    fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_toml_file(&path.to_string_lossy())
                .with_context(|| format!("loading {}", path.display()))?,
            None => NodeConfig::for_network(self.network.unwrap_or(NetworkId::Dev)),
        };
        if let Some(network) = self.network {
            if network != config.network && self.port.is_none() {
                config.port = network.default_port();
            }
            config.network = network;
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format.as_str().to_string();
        }
        config.enable_voting |= self.enable_voting;
        config.enable_metrics |= self.metrics;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;
    let format = config
        .log_format
        .parse::<LogFormat>()
        .map_err(anyhow::Error::msg)?;
    init_logging(format, &config.log_level);

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Node { action } => match action {
            NodeAction::Run => run(config).await?,
            NodeAction::Info => info(&config)?,
        },
    }
    Ok(())
}

fn open_store(config: &NodeConfig) -> anyhow::Result<Arc<dyn Store>> {
    let store = LmdbStore::open(&config.data_dir, config.lmdb_map_size)
        .with_context(|| format!("opening store in {}", config.data_dir.display()))?;
    Ok(Arc::new(store))
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    tracing::info!(
        network = config.network.as_str(),
        port = config.port,
        data_dir = %config.data_dir.display(),
        voting = config.enable_voting,
        "starting lattice node"
    );

    let store = open_store(&config)?;
    let params = NetworkParams::new(config.network);
    let metrics_path = config
        .enable_metrics
        .then(|| config.data_dir.join("metrics.prom"));
    // No transport or wallet backend is wired in yet; the node runs against
    // the null implementations and only processes what is fed to it locally.
    let node = Node::new(
        config,
        params,
        store,
        Arc::new(NullNetwork::new()),
        Arc::new(NullWallets::new()),
    )?;
    node.start()?;

    let shutdown = ShutdownController::new();
    if let Some(path) = metrics_path {
        spawn_metrics_writer(Arc::clone(&node), path, &shutdown);
    }
    shutdown.wait_for_signal().await;

    let stopping = Arc::clone(&node);
    tokio::task::spawn_blocking(move || stopping.stop()).await?;
    tracing::info!("lattice daemon exited cleanly");
    Ok(())
}

/// Periodically render the node's metrics into a text file for a
/// node_exporter textfile collector.
fn spawn_metrics_writer(node: Arc<Node>, path: PathBuf, shutdown: &ShutdownController) {
    let mut stop = shutdown.subscribe();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(METRICS_INTERVAL);
        loop {
            tokio::select! {
                _ = stop.recv() => break,
                _ = interval.tick() => {
                    if let Err(e) = write_metrics(&node, &path) {
                        tracing::warn!(error = %e, path = %path.display(), "cannot write metrics");
                    }
                }
            }
        }
    });
}

fn write_metrics(node: &Node, path: &Path) -> anyhow::Result<()> {
    let text = node.metrics.encode()?;
    let staging = path.with_extension("prom.tmp");
    std::fs::write(&staging, text)?;
    std::fs::rename(&staging, path)?;
    Ok(())
}

fn info(config: &NodeConfig) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let params = NetworkParams::new(config.network);
    let genesis = params.genesis_hash();
    let genesis_account = encode_account(&params.genesis_account);
    let ledger = Ledger::new(Arc::clone(&store), params)?;
    let txn = store.tx_begin_read()?;
    let checksum = ledger.checksum(&*txn, &Account::ZERO, &Account::new([0xFF; 32]))?;
    let report = serde_json::json!({
        "network": config.network.as_str(),
        "genesis": genesis.to_string(),
        "genesis_account": genesis_account,
        "block_count": ledger.block_count(),
        "account_count": txn.account_count()?,
        "unchecked_count": unchecked_count(&*txn)?,
        "checksum": checksum.to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
