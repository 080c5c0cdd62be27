use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("chain is empty")]
    Empty,

    #[error("first block is not a genesis block (index {0})")]
    MissingGenesis(u64),

    #[error("block {index} does not link to the current tip")]
    BrokenLink { index: u64 },

    #[error("invalid chain: {0}")]
    InvalidChain(String),

    #[error("transaction error: {0}")]
    Transaction(#[from] mc_transaction::TransactionError),
}
