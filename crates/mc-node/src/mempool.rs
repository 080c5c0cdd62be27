use mc_transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Transactions admitted by this node but not yet part of any block, in
/// admission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mempool {
    transactions: Vec<Transaction>,
}

impl From<Vec<Transaction>> for Mempool {
    fn from(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn push(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    pub fn clear(&mut self) {
        self.transactions.clear();
    }

    /// Drop every pending entry that matches (by sender, recipient and
    /// signature) one of `committed`.  Returns how many were dropped.
    pub fn remove_committed(&mut self, committed: &[Transaction]) -> usize {
        let before = self.transactions.len();
        self.transactions
            .retain(|pending| !committed.iter().any(|c| c.same_triple(pending)));
        before - self.transactions.len()
    }

    /// Total amount `participant` is already sending in pending entries.
    pub fn pending_outgoing(&self, participant: &str) -> f64 {
        self.transactions
            .iter()
            .filter(|tx| tx.sender == participant)
            .map(|tx| tx.amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(sender: &str, recipient: &str, signature: &str, amount: f64) -> Transaction {
        Transaction::new(sender, recipient, signature, amount)
    }

    #[test]
    fn keeps_admission_order() {
        let mut pool = Mempool::new();
        pool.push(tx("a", "b", "1", 1.0));
        pool.push(tx("a", "c", "2", 2.0));
        let recipients: Vec<_> = pool.transactions().iter().map(|t| t.recipient.as_str()).collect();
        assert_eq!(recipients, ["b", "c"]);
    }

    #[test]
    fn remove_committed_matches_by_triple() {
        let mut pool = Mempool::from(vec![
            tx("a", "b", "1", 1.0),
            tx("a", "b", "2", 1.0),
            tx("c", "d", "3", 4.0),
        ]);
        // Same triple, different amount: still the same pending entry.
        let committed = vec![tx("a", "b", "1", 99.0), tx("x", "y", "z", 1.0)];

        assert_eq!(pool.remove_committed(&committed), 1);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.transactions()[0].signature, "2");
    }

    #[test]
    fn pending_outgoing_sums_only_sender() {
        let pool = Mempool::from(vec![
            tx("a", "b", "1", 1.5),
            tx("b", "a", "2", 7.0),
            tx("a", "c", "3", 2.5),
        ]);
        assert_eq!(pool.pending_outgoing("a"), 4.0);
        assert_eq!(pool.pending_outgoing("z"), 0.0);
    }

    #[test]
    fn serialises_as_plain_array() {
        let pool = Mempool::from(vec![tx("a", "b", "1", 1.0)]);
        let json = serde_json::to_value(&pool).unwrap();
        assert!(json.is_array());
    }
}
