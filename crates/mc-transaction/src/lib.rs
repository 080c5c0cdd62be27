pub mod error;
pub mod signer;
pub mod transaction;
pub mod wallet;

pub use error::TransactionError;
pub use signer::{SignatureVerifier, TransactionSigner};
pub use transaction::{Transaction, MINING_SENDER};
pub use wallet::{Ed25519Verifier, Wallet};
