use mc_transaction::{SignatureVerifier, Transaction};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{Block, DIFFICULTY_PREFIX};

/// Stateless validation predicates.  Everything they need is passed in;
/// failures are reported as `false`, never as panics.
pub struct Verification;

impl Verification {
    /// Accepts `proof` when the digest of
    /// `canonical(transactions) || last_hash || proof` starts with
    /// [`DIFFICULTY_PREFIX`].
    pub fn valid_proof(transactions: &[Transaction], last_hash: &str, proof: u64) -> bool {
        match proof_prefix(transactions, last_hash) {
            Some(prefix) => meets_target(&prefix, proof),
            None => false,
        }
    }

    /// Check every block past genesis: it must follow its predecessor's
    /// index, link to the predecessor's digest, and carry a valid proof over
    /// its non-reward transactions.
    pub fn verify_chain(blocks: &[Block]) -> bool {
        for window in blocks.windows(2) {
            let prev = &window[0];
            let block = &window[1];

            if block.index != prev.index + 1 {
                debug!(index = block.index, "non-contiguous block index");
                return false;
            }
            if block.previous_hash != prev.digest() {
                debug!(index = block.index, "previous hash mismatch");
                return false;
            }
            if !Self::valid_proof(block.proof_transactions(), &block.previous_hash, block.proof) {
                debug!(index = block.index, "invalid proof");
                return false;
            }
        }
        true
    }

    /// Admission check for a single transaction.
    ///
    /// With `check_funds` the sender's balance must cover the amount and the
    /// signature must verify.  Without it only the signature is checked; that
    /// is the mode for transactions whose funds were checked on admission.
    pub fn verify_transaction(
        tx: &Transaction,
        get_balance: impl Fn(&str) -> f64,
        check_funds: bool,
        verifier: &dyn SignatureVerifier,
    ) -> bool {
        if check_funds && get_balance(&tx.sender) < tx.amount {
            return false;
        }
        verifier.verify_transaction(tx)
    }

    /// Signature check over every pending transaction.
    pub fn verify_transactions(
        pending: &[Transaction],
        get_balance: impl Fn(&str) -> f64,
        verifier: &dyn SignatureVerifier,
    ) -> bool {
        pending
            .iter()
            .all(|tx| Self::verify_transaction(tx, &get_balance, false, verifier))
    }
}

/// The part of the proof input that does not depend on the nonce.
pub(crate) fn proof_prefix(transactions: &[Transaction], last_hash: &str) -> Option<String> {
    let canonical = Transaction::canonical_json(transactions).ok()?;
    Some(format!("{canonical}{last_hash}"))
}

pub(crate) fn meets_target(prefix: &str, proof: u64) -> bool {
    let guess = format!("{prefix}{proof}");
    hex::encode(Sha256::digest(guess.as_bytes())).starts_with(DIFFICULTY_PREFIX)
}
