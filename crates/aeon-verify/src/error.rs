use aeon_types::ErrorCode;
use thiserror::Error;

/// Errors raised by the three acceptors (spec §4.6, §7).
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("signature did not verify")]
    BadSignature,
    #[error("no permitted signer matched this block's signature")]
    UnknownSigner,
    #[error("systemic transaction kind is not legal in round {0}")]
    OutOfRound(aeon_types::Round),
    #[error("duplicate systemic transaction from signer for this era")]
    DuplicateSystemic,
    #[error("signer is not a member of the permitted committee for this operation")]
    NotInCommittee,
    #[error("reveal references a commit not found earlier this era")]
    UnknownCommit,
    #[error("penalty transaction cites an empty conflict set")]
    EmptyConflictSet,
    #[error("penalty transaction cites a hash unknown to the conflict watcher")]
    UnknownConflictHash,
    #[error("block timestamp does not quantize to the expected timeslot")]
    TimestampMismatch,
    #[error("block references an unknown parent hash")]
    MissingAncestor,
}

impl ErrorCode for VerifyError {
    fn code(&self) -> &'static str {
        match self {
            Self::BadSignature => "VERIFY_BAD_SIGNATURE",
            Self::UnknownSigner => "VERIFY_UNKNOWN_SIGNER",
            Self::OutOfRound(_) => "VERIFY_OUT_OF_ROUND",
            Self::DuplicateSystemic => "VERIFY_DUPLICATE_SYSTEMIC",
            Self::NotInCommittee => "VERIFY_NOT_IN_COMMITTEE",
            Self::UnknownCommit => "VERIFY_UNKNOWN_COMMIT",
            Self::EmptyConflictSet => "VERIFY_EMPTY_CONFLICT_SET",
            Self::UnknownConflictHash => "VERIFY_UNKNOWN_CONFLICT_HASH",
            Self::TimestampMismatch => "VERIFY_TIMESTAMP_MISMATCH",
            Self::MissingAncestor => "VERIFY_MISSING_ANCESTOR",
        }
    }
}
