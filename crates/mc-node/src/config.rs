use std::{path::PathBuf, time::Duration};

/// Full configuration for a running node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// TCP port the HTTP API listens on.  Defaults to `5000`.
    pub port: u16,

    /// Name used for this node's files.  Defaults to the port number, so
    /// several nodes can share a data directory.
    pub node_id: String,

    /// Directory holding the ledger snapshot and the wallet key.
    pub data_dir: PathBuf,

    /// Wallet key file.  `None` means `<data_dir>/wallet-<node_id>.key`.
    pub key_file: Option<PathBuf>,

    /// Run without a hosting identity: the node validates, relays and
    /// resolves, but cannot submit or mine.
    pub watch_only: bool,

    /// Upper bound on any single request to a peer.
    pub peer_timeout: Duration,

    /// How often the node checks whether a peer asked for conflict
    /// resolution.
    pub resolve_interval: Duration,

    /// Peers added on startup, as `host:port`.
    pub initial_peers: Vec<String>,

    /// Keep state in memory only.
    pub ephemeral: bool,

    /// Signal to the host binary to suppress log output.
    pub quiet: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            node_id: "5000".to_string(),
            data_dir: PathBuf::from("."),
            key_file: None,
            watch_only: false,
            peer_timeout: Duration::from_secs(5),
            resolve_interval: Duration::from_secs(10),
            initial_peers: Vec::new(),
            ephemeral: false,
            quiet: false,
        }
    }
}

impl NodeConfig {
    /// Default config on a specific port, named after that port.
    pub fn on_port(port: u16) -> Self {
        Self {
            port,
            node_id: port.to_string(),
            ..Self::default()
        }
    }

    /// Location of the JSON ledger snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(format!("ledger-{}.json", self.node_id))
    }

    pub fn key_path(&self) -> PathBuf {
        self.key_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(format!("wallet-{}.key", self.node_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_port_names_files_after_port() {
        let config = NodeConfig::on_port(5001);
        assert_eq!(config.snapshot_path(), PathBuf::from("./ledger-5001.json"));
        assert_eq!(config.key_path(), PathBuf::from("./wallet-5001.key"));
    }

    #[test]
    fn explicit_key_file_wins() {
        let config = NodeConfig {
            key_file: Some(PathBuf::from("/tmp/me.key")),
            ..NodeConfig::default()
        };
        assert_eq!(config.key_path(), PathBuf::from("/tmp/me.key"));
    }
}
