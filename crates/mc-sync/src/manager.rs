use std::{future::Future, sync::Arc, time::Duration};

use futures::future::join_all;
use mc_blockchain::{Block, Blockchain};
use mc_transaction::Transaction;
use tokio::time::timeout;
use tracing::debug;

use crate::{BlockBroadcast, Delivery, PeerTransport, SyncError, TransactionBroadcast, TransportError};

/// What happened when talking to one peer.
#[derive(Debug)]
pub struct PeerOutcome<T> {
    pub peer: String,
    pub result: Result<T, SyncError>,
}

/// Fans requests out to every peer at once and bounds each call by
/// `peer_timeout`, so one silent peer cannot stall a broadcast or a
/// resolution pass.
///
/// Outcomes are returned in the order of the `peers` slice.  Interpreting
/// them (skip, flag, report) is left to the caller.
#[derive(Clone)]
pub struct SyncManager {
    transport: Arc<dyn PeerTransport>,
    peer_timeout: Duration,
}

impl SyncManager {
    pub fn new(transport: Arc<dyn PeerTransport>, peer_timeout: Duration) -> Self {
        Self {
            transport,
            peer_timeout,
        }
    }

    pub fn peer_timeout(&self) -> Duration {
        self.peer_timeout
    }

    /// Fetch every peer's chain.  A chain that is not even shaped like a
    /// chain (empty, no genesis) is reported as an error for that peer;
    /// deeper validation is left to the caller.
    pub async fn fetch_chains(&self, peers: &[String]) -> Vec<PeerOutcome<Blockchain>> {
        join_all(peers.iter().map(|peer| async move {
            let result = self
                .bounded(peer, self.transport.fetch_chain(peer))
                .await
                .and_then(|blocks| Blockchain::from_blocks(blocks).map_err(SyncError::from));
            PeerOutcome {
                peer: peer.clone(),
                result,
            }
        }))
        .await
    }

    pub async fn broadcast_transaction(
        &self,
        peers: &[String],
        tx: &Transaction,
    ) -> Vec<PeerOutcome<Delivery>> {
        let msg = TransactionBroadcast::from(tx);
        let msg = &msg;
        join_all(peers.iter().map(|peer| async move {
            PeerOutcome {
                peer: peer.clone(),
                result: self.bounded(peer, self.transport.send_transaction(peer, msg)).await,
            }
        }))
        .await
    }

    pub async fn broadcast_block(&self, peers: &[String], block: &Block) -> Vec<PeerOutcome<Delivery>> {
        let msg = BlockBroadcast {
            block: block.clone(),
        };
        let msg = &msg;
        join_all(peers.iter().map(|peer| async move {
            PeerOutcome {
                peer: peer.clone(),
                result: self.bounded(peer, self.transport.send_block(peer, msg)).await,
            }
        }))
        .await
    }

    async fn bounded<T>(
        &self,
        peer: &str,
        call: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, SyncError> {
        match timeout(self.peer_timeout, call).await {
            Ok(result) => result.map_err(SyncError::from),
            Err(_) => {
                debug!(peer, "peer call timed out");
                Err(TransportError::Timeout {
                    peer: peer.to_string(),
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;

    /// Peers keyed by address; missing peers are unreachable, peers listed in
    /// `slow` never answer in time.
    #[derive(Default)]
    struct FakeTransport {
        chains: HashMap<String, Vec<Block>>,
        statuses: HashMap<String, u16>,
        slow: Vec<String>,
    }

    impl FakeTransport {
        async fn answer<T>(&self, peer: &str, value: Option<T>) -> Result<T, TransportError> {
            if self.slow.iter().any(|p| p == peer) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            value.ok_or_else(|| TransportError::Unreachable {
                peer: peer.to_string(),
                reason: "connection refused".into(),
            })
        }
    }

    #[async_trait]
    impl PeerTransport for FakeTransport {
        async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, TransportError> {
            self.answer(peer, self.chains.get(peer).cloned()).await
        }

        async fn send_transaction(
            &self,
            peer: &str,
            _msg: &TransactionBroadcast,
        ) -> Result<Delivery, TransportError> {
            let status = self.statuses.get(peer).copied();
            self.answer(peer, status.map(Delivery::from_status)).await
        }

        async fn send_block(&self, peer: &str, _msg: &BlockBroadcast) -> Result<Delivery, TransportError> {
            let status = self.statuses.get(peer).copied();
            self.answer(peer, status.map(Delivery::from_status)).await
        }
    }

    fn manager(fake: FakeTransport) -> SyncManager {
        SyncManager::new(Arc::new(fake), Duration::from_millis(100))
    }

    fn peers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn fetch_reports_each_peer_in_order() {
        let mut fake = FakeTransport::default();
        fake.chains.insert("a".into(), vec![Block::genesis()]);
        fake.chains.insert("empty".into(), vec![]);

        let outcomes = manager(fake).fetch_chains(&peers(&["a", "gone", "empty"])).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].result.as_ref().unwrap().len(), 1);
        assert!(outcomes[1].result.as_ref().unwrap_err().is_unreachable());
        assert!(matches!(outcomes[2].result, Err(SyncError::Blockchain(_))));
    }

    #[tokio::test]
    async fn slow_peer_times_out_without_blocking_others() {
        let mut fake = FakeTransport::default();
        fake.statuses.insert("fast".into(), 201);
        fake.statuses.insert("slow".into(), 201);
        fake.slow.push("slow".into());

        let tx = Transaction::new("a", "b", "s", 1.0);
        let started = std::time::Instant::now();
        let outcomes = manager(fake)
            .broadcast_transaction(&peers(&["slow", "fast"]), &tx)
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(
            outcomes[0].result,
            Err(SyncError::Transport(TransportError::Timeout { .. }))
        ));
        assert_eq!(outcomes[1].result.as_ref().unwrap(), &Delivery::Accepted);
    }

    #[tokio::test]
    async fn block_broadcast_surfaces_conflicts() {
        let mut fake = FakeTransport::default();
        fake.statuses.insert("behind".into(), 409);
        fake.statuses.insert("broken".into(), 500);

        let outcomes = manager(fake)
            .broadcast_block(&peers(&["behind", "broken"]), &Block::genesis())
            .await;

        assert_eq!(outcomes[0].result.as_ref().unwrap(), &Delivery::Conflict);
        assert_eq!(outcomes[1].result.as_ref().unwrap(), &Delivery::Rejected(500));
    }

    #[tokio::test]
    async fn no_peers_means_no_outcomes() {
        let outcomes = manager(FakeTransport::default()).fetch_chains(&[]).await;
        assert!(outcomes.is_empty());
    }
}
