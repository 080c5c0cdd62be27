use libp2p_identity::ed25519;

use crate::{SignatureVerifier, TransactionError, TransactionSigner};

/// An ed25519 key pair acting as a ledger participant.
#[derive(Clone)]
pub struct Wallet {
    keypair: ed25519::Keypair,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("public_key", &self.public_key())
            .finish()
    }
}

impl Wallet {
    /// Generate a fresh random key pair.
    pub fn generate() -> Self {
        Self {
            keypair: ed25519::Keypair::generate(),
        }
    }

    /// Restore a wallet from the hex encoding of its 32-byte secret key.
    pub fn from_secret_hex(secret: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(secret.trim())?;
        let secret = ed25519::SecretKey::try_from_bytes(bytes)
            .map_err(|e| TransactionError::InvalidKey(e.to_string()))?;
        Ok(Self {
            keypair: ed25519::Keypair::from(secret),
        })
    }

    /// Hex encoding of the secret key, suitable for a key file.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.keypair.secret())
    }
}

impl TransactionSigner for Wallet {
    fn public_key(&self) -> String {
        hex::encode(self.keypair.public().to_bytes())
    }

    fn sign(&self, payload: &[u8]) -> String {
        hex::encode(self.keypair.sign(payload))
    }
}

/// [`SignatureVerifier`] for hex-encoded ed25519 keys and signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, payload: &[u8], signature: &str, public_key: &str) -> bool {
        let Ok(key_bytes) = hex::decode(public_key) else {
            return false;
        };
        let Ok(key) = ed25519::PublicKey::try_from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };
        key.verify(payload, &signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Transaction;

    #[test]
    fn signed_transaction_verifies() {
        let wallet = Wallet::generate();
        let tx = wallet.sign_transaction("bob", 3.5);
        assert_eq!(tx.sender, wallet.public_key());
        assert!(Ed25519Verifier.verify_transaction(&tx));
    }

    #[test]
    fn tampered_amount_fails_verification() {
        let wallet = Wallet::generate();
        let mut tx = wallet.sign_transaction("bob", 3.5);
        tx.amount = 350.0;
        assert!(!Ed25519Verifier.verify_transaction(&tx));
    }

    #[test]
    fn signature_from_other_key_is_rejected() {
        let alice = Wallet::generate();
        let mallory = Wallet::generate();
        let forged = mallory.sign(&Transaction::payload_for(&alice.public_key(), "bob", 1.0));
        let tx = Transaction::new(alice.public_key(), "bob", forged, 1.0);
        assert!(!Ed25519Verifier.verify_transaction(&tx));
    }

    #[test]
    fn reward_never_verifies() {
        assert!(!Ed25519Verifier.verify_transaction(&Transaction::reward("miner", 10.0)));
    }

    #[test]
    fn malformed_hex_is_rejected_not_panicking() {
        assert!(!Ed25519Verifier.verify(b"payload", "zz", "not-hex"));
    }

    #[test]
    fn secret_hex_round_trips_identity() {
        let wallet = Wallet::generate();
        let restored = Wallet::from_secret_hex(&wallet.secret_hex()).unwrap();
        assert_eq!(wallet.public_key(), restored.public_key());
    }

    #[test]
    fn short_secret_is_an_error() {
        assert!(Wallet::from_secret_hex("abcd").is_err());
    }
}
