use aeon_crypto::CryptoError;
use aeon_dag::DagError;
use aeon_permissions::PermissionsError;
use aeon_types::ErrorCode;
use aeon_verify::VerifyError;
use thiserror::Error;

/// Errors surfaced by the node's step loop and incoming-block handling.
/// Acceptance failures from `aeon-verify` are not wrapped here — a
/// rejected transaction or block is a routine outcome the caller decides
/// how to act on, not a fault in the node itself.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Dag(#[from] DagError),
    #[error(transparent)]
    Permissions(#[from] PermissionsError),
    #[error("local key is not part of the active validator set this era")]
    NotAValidator,
    #[error("no epoch hash governs the chain this block would extend")]
    UnresolvedEpoch,
    #[error("era is not yet seeded, permissions cannot be computed")]
    UnseededEra,
    #[error(transparent)]
    Admission(#[from] VerifyError),
}

impl ErrorCode for NodeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Crypto(_) => "NODE_CRYPTO",
            Self::Dag(_) => "NODE_DAG",
            Self::Permissions(_) => "NODE_PERMISSIONS",
            Self::NotAValidator => "NODE_NOT_A_VALIDATOR",
            Self::UnresolvedEpoch => "NODE_UNRESOLVED_EPOCH",
            Self::UnseededEra => "NODE_UNSEEDED_ERA",
            Self::Admission(_) => "NODE_ADMISSION_REJECTED",
        }
    }
}

/// Re-exported so callers matching on acceptance outcomes don't need a
/// direct `aeon-verify` dependency of their own.
pub type AcceptanceError = VerifyError;
