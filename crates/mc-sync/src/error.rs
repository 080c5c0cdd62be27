use thiserror::Error;

/// Failure talking to a single peer.  Never fatal for the operation that
/// fanned out to that peer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("peer {peer} unreachable: {reason}")]
    Unreachable { peer: String, reason: String },

    #[error("peer {peer} timed out")]
    Timeout { peer: String },

    #[error("peer {peer} answered with status {status}")]
    Status { peer: String, status: u16 },

    #[error("peer {peer} sent an undecodable response: {reason}")]
    Decode { peer: String, reason: String },

    #[error("http client error: {0}")]
    Client(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("blockchain error: {0}")]
    Blockchain(#[from] mc_blockchain::BlockchainError),
}

impl SyncError {
    /// True when the peer could not be reached at all (refused, dropped, or
    /// too slow), as opposed to answering with something unusable.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            SyncError::Transport(TransportError::Unreachable { .. } | TransportError::Timeout { .. })
        )
    }
}
