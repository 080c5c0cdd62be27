pub mod block;
pub mod blockchain;
pub mod error;
pub mod proof;
pub mod verification;

pub use block::Block;
pub use blockchain::Blockchain;
pub use error::BlockchainError;
pub use proof::{proof_of_work, ProofOfWork};
pub use verification::Verification;

/// Amount credited to the miner of a block.
pub const MINING_REWARD: f64 = 10.0;

/// Required prefix of a proof digest.  Fixed; there is no difficulty
/// adjustment.
pub const DIFFICULTY_PREFIX: &str = "00";

/// Nonce stored in the genesis block.  The genesis block is never checked
/// against the proof predicate, so any value works.
pub const GENESIS_PROOF: u64 = 100;
