use mc_blockchain::Block;
use mc_transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Peer endpoint returning the full chain as a JSON array of blocks.
pub const PATH_CHAIN: &str = "/chain";
/// Peer endpoint accepting a relayed transaction.
pub const PATH_BROADCAST_TRANSACTION: &str = "/broadcast-transaction";
/// Peer endpoint accepting a freshly mined block.
pub const PATH_BROADCAST_BLOCK: &str = "/broadcast-block";

/// Body of a transaction relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionBroadcast {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
    pub signature: String,
}

impl From<&Transaction> for TransactionBroadcast {
    fn from(tx: &Transaction) -> Self {
        Self {
            sender: tx.sender.clone(),
            recipient: tx.recipient.clone(),
            amount: tx.amount,
            signature: tx.signature.clone(),
        }
    }
}

impl From<TransactionBroadcast> for Transaction {
    fn from(msg: TransactionBroadcast) -> Self {
        Transaction::new(msg.sender, msg.recipient, msg.signature, msg.amount)
    }
}

/// Body of a block relay: `{"block": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockBroadcast {
    pub block: Block,
}

/// Build the URL of `path` on a peer given as `host:port`.
pub fn peer_url(peer: &str, path: &str) -> String {
    format!("http://{peer}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_broadcast_carries_all_four_fields() {
        let tx = Transaction::new("alice", "bob", "sig", 4.0);
        let json = serde_json::to_value(TransactionBroadcast::from(&tx)).unwrap();
        assert_eq!(json["sender"], "alice");
        assert_eq!(json["recipient"], "bob");
        assert_eq!(json["signature"], "sig");
        assert_eq!(json["amount"], 4.0);
    }

    #[test]
    fn transaction_broadcast_missing_field_is_rejected() {
        let body = r#"{"sender":"a","recipient":"b","amount":1.0}"#;
        assert!(serde_json::from_str::<TransactionBroadcast>(body).is_err());
    }

    #[test]
    fn block_broadcast_wraps_block_record() {
        let json = serde_json::to_value(BlockBroadcast { block: Block::genesis() }).unwrap();
        assert_eq!(json["block"]["index"], 0);
        assert_eq!(json["block"]["previous_hash"], "");
    }

    #[test]
    fn peer_url_joins_host_and_path() {
        assert_eq!(peer_url("localhost:5001", PATH_CHAIN), "http://localhost:5001/chain");
    }
}
