use crate::Transaction;

/// Checks that a payload was signed by the holder of `public_key`.
///
/// Keys and signatures travel as hex strings, the same form they take inside
/// [`Transaction`] records.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, payload: &[u8], signature: &str, public_key: &str) -> bool;

    /// Verify a transfer against its own sender key.  Reward transactions
    /// have no signer and never verify.
    fn verify_transaction(&self, tx: &Transaction) -> bool {
        if tx.is_reward() {
            return false;
        }
        self.verify(&tx.signing_payload(), &tx.signature, &tx.sender)
    }
}

/// Produces signatures on behalf of one participant.
pub trait TransactionSigner {
    /// Hex public key identifying this participant on the ledger.
    fn public_key(&self) -> String;

    /// Hex signature over `payload`.
    fn sign(&self, payload: &[u8]) -> String;

    /// Build a signed transfer from this participant to `recipient`.
    fn sign_transaction(&self, recipient: &str, amount: f64) -> Transaction {
        let sender = self.public_key();
        let signature = self.sign(&Transaction::payload_for(&sender, recipient, amount));
        Transaction::new(sender, recipient, signature, amount)
    }
}
