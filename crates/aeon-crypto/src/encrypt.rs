//! Asymmetric encrypt/decrypt, used to seal each validator's secret-share
//! piece and the PUBLIC-round ephemeral keys under the recipient's
//! published public key (spec §3, `SplitRandomTransaction`).

use crate::error::CryptoError;
use aeon_types::{PrivateKey, PublicKey};

/// Encrypts `plaintext` so that only the holder of `pubkey`'s matching
/// private key can recover it.
pub fn encrypt(pubkey: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    ecies::encrypt(pubkey.as_bytes(), plaintext).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

/// Decrypts a payload produced by [`encrypt`] using the matching private
/// key.
pub fn decrypt(privkey: &PrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    ecies::decrypt(privkey.as_bytes(), ciphertext)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}
