use mc_blockchain::Block;
use mc_transaction::Transaction;

/// Side effects of ledger operations that callers may want to observe
/// without them changing the operation's own result.
///
/// In particular, peer propagation failures land here rather than turning a
/// locally admitted transaction into a failed submission.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    /// A transaction entered the local mempool.
    TransactionAdmitted(Transaction),

    /// A reachable peer refused a transaction we relayed.
    TransactionRejected { peer: String, status: u16 },

    /// This node mined and appended a block.
    BlockMined(Block),

    /// A reachable peer refused a block we relayed.
    BlockRejected { peer: String, status: u16 },

    /// A block from a peer was appended to the local chain.
    BlockAccepted { index: u64 },

    /// A peer could not be reached (refused or timed out) and was skipped.
    PeerUnreachable { peer: String, reason: String },

    /// A peer answered, but with an error status, an undecodable body or a
    /// malformed chain, and was skipped.
    PeerMisbehaved { peer: String, reason: String },

    /// A peer reported a diverging chain; conflict resolution is due.
    ResolutionRequested { peer: String },

    /// Conflict resolution adopted a longer peer chain.
    ChainReplaced { new_length: usize },

    /// State changed in memory but could not be written out.
    PersistFailed(String),
}
