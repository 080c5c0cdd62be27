use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use mc_node::{
    api::{self, ApiState},
    keystore, tasks, FileStore, Ledger, MemoryStore, NodeConfig, SnapshotStore,
};
use mc_sync::{HttpTransport, SyncManager};
use mc_transaction::{Ed25519Verifier, TransactionSigner};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Minichain ledger node.
#[derive(Parser, Debug)]
#[command(
    name = "mc-node",
    version,
    about = "Minichain proof-of-work ledger node",
    long_about = "Runs a minichain node: keeps a local chain and mempool, mines \
                  blocks, relays transactions and blocks to its peers over HTTP, \
                  and adopts the longest valid chain on conflict."
)]
struct Cli {
    /// TCP port the HTTP API listens on.
    #[arg(short, long, default_value_t = 5000, env = "MC_PORT")]
    port: u16,

    /// Name used for this node's files.  Defaults to the port.
    #[arg(long, env = "MC_NODE_ID")]
    node_id: Option<String>,

    /// Directory for the ledger snapshot and wallet key.
    #[arg(long, default_value = ".", env = "MC_DATA_DIR")]
    data_dir: PathBuf,

    /// Upper bound on a single peer request, in milliseconds.
    #[arg(long, default_value_t = 5000, env = "MC_PEER_TIMEOUT_MS")]
    peer_timeout_ms: u64,

    /// How often (in seconds) to check whether a peer asked for resolution.
    #[arg(long, default_value_t = 10, env = "MC_RESOLVE_INTERVAL")]
    resolve_interval_secs: u64,

    /// Wallet key file.  Defaults to `<data-dir>/wallet-<node-id>.key`.
    #[arg(long, env = "MC_KEY_FILE")]
    key_file: Option<PathBuf>,

    /// Peer to add on startup, as host:port.  May be repeated.
    #[arg(long = "peer", value_name = "HOST:PORT")]
    peers: Vec<String>,

    /// Run without a wallet: validate, relay and resolve only.
    #[arg(long, default_value_t = false, env = "MC_WATCH_ONLY")]
    watch_only: bool,

    /// Keep all state in memory.
    #[arg(long, default_value_t = false, env = "MC_EPHEMERAL")]
    ephemeral: bool,

    /// Suppress log output to stderr.
    #[arg(short, long, default_value_t = false, env = "MC_QUIET")]
    quiet: bool,
}

/// `RUST_LOG` when set and parseable, `mc_node=info` otherwise; `off` when
/// quiet.
fn log_filter(quiet: bool, rust_log: Option<&str>) -> EnvFilter {
    if quiet {
        return EnvFilter::new("off");
    }
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("mc_node=info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.quiet, rust_log.as_deref()))
        .init();

    let config = NodeConfig {
        port: cli.port,
        node_id: cli.node_id.unwrap_or_else(|| cli.port.to_string()),
        data_dir: cli.data_dir,
        key_file: cli.key_file,
        watch_only: cli.watch_only,
        peer_timeout: Duration::from_millis(cli.peer_timeout_ms),
        resolve_interval: Duration::from_secs(cli.resolve_interval_secs),
        initial_peers: cli.peers,
        ephemeral: cli.ephemeral,
        quiet: cli.quiet,
    };

    info!(
        port = config.port,
        node_id = %config.node_id,
        ephemeral = config.ephemeral,
        watch_only = config.watch_only,
        "Starting minichain node"
    );

    let wallet = if config.watch_only {
        None
    } else {
        let path = config.key_path();
        let wallet = keystore::load_or_create(&path)
            .with_context(|| format!("loading wallet from {}", path.display()))?;
        Some(Arc::new(wallet))
    };

    let transport = HttpTransport::new(config.peer_timeout)?;
    let sync = SyncManager::new(Arc::new(transport), config.peer_timeout);
    let store: Box<dyn SnapshotStore> = if config.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        Box::new(FileStore::new(config.snapshot_path()))
    };

    let (mut ledger, events) = Ledger::new(
        wallet.as_ref().map(|w| w.public_key()),
        Arc::new(Ed25519Verifier),
        sync,
        store,
    );
    ledger.load();
    for peer in &config.initial_peers {
        ledger.add_peer(peer.clone());
    }
    let ledger = Arc::new(Mutex::new(ledger));

    let shutdown = CancellationToken::new();
    tokio::spawn(tasks::log_events(events));
    tokio::spawn(tasks::resolve_when_flagged(
        ledger.clone(),
        config.resolve_interval,
        shutdown.clone(),
    ));
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutting down");
            }
            shutdown.cancel();
        });
    }

    api::serve(config.port, ApiState { ledger, wallet }, shutdown).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn rust_log_level_for_node_is_kept() {
        let filter = log_filter(false, Some("mc_node=debug"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn default_filter_is_info() {
        assert_eq!(log_filter(false, None).max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn quiet_wins_over_rust_log() {
        let filter = log_filter(true, Some("trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::OFF));
    }
}
