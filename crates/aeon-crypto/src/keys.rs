//! Keypair generation, signing, and verification.
//!
//! Concretely backed by secp256k1/ECDSA, chosen because its 33-byte
//! compressed public key and 64-byte compact signature match the reference
//! wire widths in spec §6 exactly, with no repacking needed at the codec
//! boundary.

use crate::error::CryptoError;
use aeon_types::{PrivateKey, PublicKey, Signature};
use rand::rngs::OsRng;
use secp256k1::ecdsa;
use secp256k1::{Message, Secp256k1, SecretKey};
use zeroize::Zeroize;

/// A generated keypair. The secret half is held only in memory and
/// zeroized on drop; callers that need to persist a private key must do so
/// through their own explicit serialization, not via `Debug`.
pub struct Keypair {
    secret: SecretKey,
    public: secp256k1::PublicKey,
}

impl Keypair {
    /// Generates a fresh keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let mut rng = OsRng;
        let (secret, public) = secp.generate_keypair(&mut rng);
        Keypair { secret, public }
    }

    /// Reconstructs a keypair from a raw 32-byte private scalar, as
    /// revealed by `RevealRandomTransaction`/`PrivateKeyTransaction`.
    pub fn from_private_key(key: &PrivateKey) -> Result<Self, CryptoError> {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(key.as_bytes())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let public = secp256k1::PublicKey::from_secret_key(&secp, &secret);
        Ok(Keypair { secret, public })
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.public.serialize())
    }

    pub fn private_key(&self) -> PrivateKey {
        PrivateKey(self.secret.secret_bytes())
    }

    /// Signs a 32-byte message digest (typically a block or transaction
    /// hash). The caller is responsible for hashing first; this function
    /// never hashes its input a second time.
    pub fn sign(&self, digest: &[u8; 32]) -> Result<Signature, CryptoError> {
        let secp = Secp256k1::new();
        let msg = Message::from_digest_slice(digest)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let sig = secp.sign_ecdsa(&msg, &self.secret);
        Ok(Signature(sig.serialize_compact()))
    }
}

impl Drop for Keypair {
    fn drop(&mut self) {
        let mut bytes = self.secret.secret_bytes();
        bytes.zeroize();
    }
}

/// Verifies a signature over a 32-byte digest against a candidate public
/// key. Returns `Ok(())` on a match, `Err(VerificationFailed)` otherwise —
/// callers that try several candidate keys (spec §3 "tries each of the
/// small set of candidate public keys") simply call this in a loop and
/// take the first `Ok`.
pub fn verify(pubkey: &PublicKey, digest: &[u8; 32], signature: &Signature) -> Result<(), CryptoError> {
    let secp = Secp256k1::new();
    let pk = secp256k1::PublicKey::from_slice(pubkey.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let msg =
        Message::from_digest_slice(digest).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let sig = ecdsa::Signature::from_compact(signature.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    secp.verify_ecdsa(&msg, &sig, &pk)
        .map_err(|_| CryptoError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let kp = Keypair::generate();
        let digest = [7u8; 32];
        let sig = kp.sign(&digest).unwrap();
        verify(&kp.public_key(), &digest, &sig).unwrap();
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let kp = Keypair::generate();
        let other = Keypair::generate();
        let digest = [9u8; 32];
        let sig = kp.sign(&digest).unwrap();
        assert!(verify(&other.public_key(), &digest, &sig).is_err());
    }

    #[test]
    fn from_private_key_recovers_same_public_key() {
        let kp = Keypair::generate();
        let restored = Keypair::from_private_key(&kp.private_key()).unwrap();
        assert_eq!(kp.public_key(), restored.public_key());
    }
}
