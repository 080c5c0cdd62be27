use serde::{Deserialize, Serialize};

use crate::TransactionError;

/// Sender identifier reserved for block-reward transactions.  A reward has no
/// real signer and carries an empty signature.
pub const MINING_SENDER: &str = "MINING";

/// A value transfer between two participants of the ledger.
///
/// Participants are identified by the hex encoding of their public key, so
/// `sender` doubles as the key the signature is checked against.
///
/// Field order is significant: it fixes the canonical JSON form that block
/// digests and proof-of-work are computed over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Hex public key of the payer, or [`MINING_SENDER`] for rewards.
    pub sender: String,

    /// Hex public key of the payee.
    pub recipient: String,

    /// Hex signature over [`Transaction::signing_payload`].  Empty for rewards.
    pub signature: String,

    /// Transferred amount.  Never negative.
    pub amount: f64,
}

impl Transaction {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        signature: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            signature: signature.into(),
            amount,
        }
    }

    /// Build the reward transaction crediting `recipient` for a mined block.
    pub fn reward(recipient: impl Into<String>, amount: f64) -> Self {
        Self::new(MINING_SENDER, recipient, String::new(), amount)
    }

    pub fn is_reward(&self) -> bool {
        self.sender == MINING_SENDER
    }

    /// Bytes covered by the sender's signature: `sender || recipient || amount`.
    pub fn signing_payload(&self) -> Vec<u8> {
        Self::payload_for(&self.sender, &self.recipient, self.amount)
    }

    /// Signing payload for a transfer that has not been built yet.
    pub fn payload_for(sender: &str, recipient: &str, amount: f64) -> Vec<u8> {
        format!("{sender}{recipient}{amount}").into_bytes()
    }

    /// Mempool identity: two transactions are the same pending entry when
    /// their sender, recipient and signature all match.
    pub fn same_triple(&self, other: &Transaction) -> bool {
        self.sender == other.sender
            && self.recipient == other.recipient
            && self.signature == other.signature
    }

    /// Canonical string form of an ordered transaction list, used as input to
    /// the proof-of-work predicate.
    pub fn canonical_json(transactions: &[Transaction]) -> Result<String, TransactionError> {
        Ok(serde_json::to_string(transactions)?)
    }
}
