use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("blockchain error: {0}")]
    Blockchain(#[from] mc_blockchain::BlockchainError),

    #[error("transaction error: {0}")]
    Transaction(#[from] mc_transaction::TransactionError),

    #[error("sync error: {0}")]
    Sync(#[from] mc_sync::SyncError),

    #[error("transport error: {0}")]
    Transport(#[from] mc_sync::TransportError),
}

/// Why a transaction was not admitted to the mempool.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdmissionError {
    #[error("no hosting node configured")]
    NoHostingNode,

    #[error("amount {0} is not a non-negative number")]
    InvalidAmount(f64),

    #[error("insufficient funds: balance {balance}, amount {amount}")]
    InsufficientFunds { balance: f64, amount: f64 },

    #[error("signature does not verify against the sender key")]
    InvalidSignature,
}

/// Why mining did not produce a block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiningError {
    #[error("no hosting node configured")]
    NoHostingNode,

    #[error("a pending transaction failed signature verification")]
    InvalidPendingTransaction,

    #[error("proof-of-work search was cancelled")]
    Cancelled,

    #[error("chain tip or mempool changed while mining")]
    Stale,
}

/// Why a block received from a peer was not appended.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockRejection {
    #[error("proof does not satisfy the difficulty target")]
    InvalidProof,

    #[error("previous hash does not match the local tip")]
    PreviousHashMismatch,

    #[error("expected block index {expected}, got {found}")]
    IndexMismatch { expected: u64, found: u64 },
}
