use async_trait::async_trait;
use mc_blockchain::Block;

use crate::{BlockBroadcast, TransactionBroadcast, TransportError};

/// HTTP status a peer uses to say "my chain disagrees with this block".
pub const STATUS_CONFLICT: u16 = 409;

/// How a reachable peer answered a relayed transaction or block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Accepted,
    /// The peer's chain diverges from ours; we should run conflict resolution.
    Conflict,
    /// Any other application-level refusal, with its status code.
    Rejected(u16),
}

impl Delivery {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => Delivery::Accepted,
            STATUS_CONFLICT => Delivery::Conflict,
            other => Delivery::Rejected(other),
        }
    }
}

/// Request/response access to other nodes, addressed as `host:port`.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Fetch the peer's full chain, genesis first.
    async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, TransportError>;

    async fn send_transaction(
        &self,
        peer: &str,
        msg: &TransactionBroadcast,
    ) -> Result<Delivery, TransportError>;

    async fn send_block(&self, peer: &str, msg: &BlockBroadcast) -> Result<Delivery, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_deliveries() {
        assert_eq!(Delivery::from_status(200), Delivery::Accepted);
        assert_eq!(Delivery::from_status(201), Delivery::Accepted);
        assert_eq!(Delivery::from_status(409), Delivery::Conflict);
        assert_eq!(Delivery::from_status(400), Delivery::Rejected(400));
        assert_eq!(Delivery::from_status(500), Delivery::Rejected(500));
    }
}
