use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    #[error("signature did not verify")]
    VerificationFailed,
    #[error("asymmetric encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("asymmetric decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("secret splitting failed: {0}")]
    SplitFailed(String),
    #[error("secret recombination failed: {0}")]
    RecombineFailed(String),
}
