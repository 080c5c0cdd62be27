use chrono::Utc;
use mc_transaction::Transaction;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::GENESIS_PROOF;

/// A single block of the ledger.
///
/// The serialized form (`index`, `previous_hash`, `transactions`, `proof`,
/// `timestamp`) is also the record exchanged with peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain (genesis = 0).
    pub index: u64,

    /// Hex digest of the previous block.  Empty for the genesis block.
    pub previous_hash: String,

    /// Ordered transactions.  When mined locally the last entry is the reward.
    pub transactions: Vec<Transaction>,

    /// Nonce satisfying the proof predicate over all but the last transaction.
    pub proof: u64,

    /// Unix timestamp (seconds) when this block was created.
    pub timestamp: i64,
}

impl Block {
    /// Build a block stamped with the current time.
    pub fn new(
        index: u64,
        previous_hash: impl Into<String>,
        transactions: Vec<Transaction>,
        proof: u64,
    ) -> Self {
        Self {
            index,
            previous_hash: previous_hash.into(),
            transactions,
            proof,
            timestamp: Utc::now().timestamp(),
        }
    }

    /// The fixed chain anchor shared by every node.
    pub fn genesis() -> Self {
        Self {
            index: 0,
            previous_hash: String::new(),
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            timestamp: 0,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// SHA-256 over the canonical JSON form of the block: the compact
    /// serialisation with fields in declaration order, as exchanged with peers.
    pub fn hash(&self) -> [u8; 32] {
        let canonical = serde_json::to_vec(self).expect("block records always serialise");
        Sha256::digest(&canonical).into()
    }

    /// Hex-encoded block hash, the form stored in `previous_hash`.
    pub fn digest(&self) -> String {
        hex::encode(self.hash())
    }

    /// The transactions the proof was searched over: everything except the
    /// trailing reward.
    pub fn proof_transactions(&self) -> &[Transaction] {
        match self.transactions.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Block {
        Block {
            index: 1,
            previous_hash: "ab".into(),
            transactions: vec![
                Transaction::new("a", "b", "s1", 1.0),
                Transaction::new("c", "d", "s2", 2.0),
            ],
            proof: 7,
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn digest_is_deterministic_for_same_content() {
        assert_eq!(sample().digest(), sample().digest());
        assert_eq!(sample().digest().len(), 64);
    }

    #[test]
    fn digest_changes_with_transaction_order() {
        let mut swapped = sample();
        swapped.transactions.reverse();
        assert_ne!(sample().digest(), swapped.digest());
    }

    #[test]
    fn digest_changes_with_any_header_field() {
        let base = sample().digest();

        let mut b = sample();
        b.proof += 1;
        assert_ne!(base, b.digest());

        let mut b = sample();
        b.timestamp += 1;
        assert_ne!(base, b.digest());

        let mut b = sample();
        b.previous_hash.push('0');
        assert_ne!(base, b.digest());
    }

    #[test]
    fn genesis_digest_is_pinned() {
        assert_eq!(
            Block::genesis().digest(),
            "62e047f53ba58b7d024145fdb718daad2a83aed80199eecc400673a51e4df090"
        );
    }

    #[test]
    fn digest_hashes_compact_json_record() {
        let block = sample();
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(block.digest(), hex::encode(Sha256::digest(json.as_bytes())));
    }

    #[test]
    fn shifting_bytes_between_fields_changes_digest() {
        let mut a = sample();
        a.transactions = vec![Transaction::new("ab", "c", "", 1.0)];
        let mut b = sample();
        b.transactions = vec![Transaction::new("a", "bc", "", 1.0)];
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn proof_transactions_drop_the_reward() {
        let block = sample();
        assert_eq!(block.proof_transactions().len(), 1);
        assert_eq!(block.proof_transactions()[0].sender, "a");
        assert!(Block::genesis().proof_transactions().is_empty());
    }

    #[test]
    fn wire_format_uses_previous_hash_field() {
        let json = serde_json::to_value(Block::genesis()).unwrap();
        assert_eq!(json["previous_hash"], "");
        assert_eq!(json["proof"], GENESIS_PROOF);
        assert!(json["transactions"].as_array().unwrap().is_empty());
    }
}
