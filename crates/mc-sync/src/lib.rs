pub mod error;
pub mod http;
pub mod manager;
pub mod protocol;
pub mod transport;

pub use error::{SyncError, TransportError};
pub use http::HttpTransport;
pub use manager::{PeerOutcome, SyncManager};
pub use protocol::{BlockBroadcast, TransactionBroadcast};
pub use transport::{Delivery, PeerTransport};
