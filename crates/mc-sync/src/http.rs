use std::time::Duration;

use async_trait::async_trait;
use mc_blockchain::Block;
use reqwest::Client;
use tracing::debug;

use crate::{
    protocol::{peer_url, PATH_BROADCAST_BLOCK, PATH_BROADCAST_TRANSACTION, PATH_CHAIN},
    BlockBroadcast, Delivery, PeerTransport, TransactionBroadcast, TransportError,
};

/// [`PeerTransport`] speaking JSON over HTTP to the endpoints in
/// [`crate::protocol`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

fn classify(peer: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout { peer: peer.to_string() }
    } else if err.is_decode() {
        TransportError::Decode {
            peer: peer.to_string(),
            reason: err.to_string(),
        }
    } else {
        TransportError::Unreachable {
            peer: peer.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, TransportError> {
        let response = self
            .client
            .get(peer_url(peer, PATH_CHAIN))
            .send()
            .await
            .map_err(|e| classify(peer, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                peer: peer.to_string(),
                status: status.as_u16(),
            });
        }

        let blocks: Vec<Block> = response.json().await.map_err(|e| classify(peer, e))?;
        debug!(peer, length = blocks.len(), "fetched chain");
        Ok(blocks)
    }

    async fn send_transaction(
        &self,
        peer: &str,
        msg: &TransactionBroadcast,
    ) -> Result<Delivery, TransportError> {
        let response = self
            .client
            .post(peer_url(peer, PATH_BROADCAST_TRANSACTION))
            .json(msg)
            .send()
            .await
            .map_err(|e| classify(peer, e))?;
        Ok(Delivery::from_status(response.status().as_u16()))
    }

    async fn send_block(&self, peer: &str, msg: &BlockBroadcast) -> Result<Delivery, TransportError> {
        let response = self
            .client
            .post(peer_url(peer, PATH_BROADCAST_BLOCK))
            .json(msg)
            .send()
            .await
            .map_err(|e| classify(peer, e))?;
        Ok(Delivery::from_status(response.status().as_u16()))
    }
}
