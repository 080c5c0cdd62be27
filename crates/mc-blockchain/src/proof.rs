use std::time::{Duration, Instant};

use mc_transaction::Transaction;
use tokio_util::sync::CancellationToken;

use crate::verification::{meets_target, proof_prefix};

/// How many candidates are tried between two cancellation checks.
pub const CANCEL_POLL_INTERVAL: u64 = 1024;

/// Result of a successful proof-of-work search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    /// First nonce satisfying the proof predicate.
    pub proof: u64,
    /// Number of candidates hashed, including the winning one.
    pub attempts: u64,
    pub elapsed: Duration,
}

/// Linear search for the smallest nonce, starting at 0, that makes
/// `valid_proof(transactions, last_hash, nonce)` hold.
///
/// There is no upper bound.  Returns `None` only when `cancel` fires (or the
/// nonce space is exhausted, which does not happen at the fixed difficulty).
pub fn proof_of_work(
    transactions: &[Transaction],
    last_hash: &str,
    cancel: &CancellationToken,
) -> Option<ProofOfWork> {
    let start = Instant::now();
    let prefix = proof_prefix(transactions, last_hash)?;

    let mut candidate: u64 = 0;
    loop {
        if candidate % CANCEL_POLL_INTERVAL == 0 && cancel.is_cancelled() {
            return None;
        }
        if meets_target(&prefix, candidate) {
            return Some(ProofOfWork {
                proof: candidate,
                attempts: candidate + 1,
                elapsed: start.elapsed(),
            });
        }
        candidate = candidate.checked_add(1)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Verification;

    #[test]
    fn returns_first_valid_nonce() {
        let txs = vec![Transaction::new("a", "b", "sig", 2.0)];
        let found = proof_of_work(&txs, "last", &CancellationToken::new()).unwrap();

        assert!(Verification::valid_proof(&txs, "last", found.proof));
        assert!((0..found.proof).all(|p| !Verification::valid_proof(&txs, "last", p)));
        assert_eq!(found.attempts, found.proof + 1);
    }

    #[test]
    fn empty_transaction_set_still_has_a_proof() {
        let found = proof_of_work(&[], "last", &CancellationToken::new()).unwrap();
        assert!(Verification::valid_proof(&[], "last", found.proof));
    }

    #[test]
    fn cancelled_search_returns_none() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(proof_of_work(&[], "last", &token).is_none());
    }
}
