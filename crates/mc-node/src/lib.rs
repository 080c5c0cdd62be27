pub mod api;
pub mod config;
pub mod error;
pub mod event;
pub mod keystore;
pub mod ledger;
pub mod mempool;
pub mod store;
pub mod tasks;

pub use config::NodeConfig;
pub use error::{AdmissionError, BlockRejection, MiningError, NodeError};
pub use event::LedgerEvent;
pub use ledger::{BlockReception, Ledger, MiningJob, Origin, SharedLedger};
pub use mempool::Mempool;
pub use store::{FileStore, MemoryStore, NodeSnapshot, SnapshotStore};
