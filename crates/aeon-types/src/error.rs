// Core error taxonomy shared by every aeon crate that touches transactions or blocks.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error,
/// useful for metrics and logs where the `Display` message may vary.
pub trait ErrorCode {
    fn code(&self) -> &'static str;
}

/// Errors raised while packing or parsing wire-format bytes.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame is shorter than its declared fixed-width header")]
    Truncated,
    #[error("length-prefixed field length {0} exceeds remaining frame bytes")]
    LengthOutOfBounds(u32),
    #[error("unknown transaction tag byte {0:#04x}")]
    UnknownTag(u8),
    #[error("fixed-width field had wrong length: expected {expected}, got {got}")]
    BadFixedWidth { expected: usize, got: usize },
}

impl ErrorCode for CodecError {
    fn code(&self) -> &'static str {
        match self {
            Self::Truncated => "CODEC_TRUNCATED",
            Self::LengthOutOfBounds(_) => "CODEC_LENGTH_OOB",
            Self::UnknownTag(_) => "CODEC_UNKNOWN_TAG",
            Self::BadFixedWidth { .. } => "CODEC_BAD_WIDTH",
        }
    }
}

/// Errors recognized by the core consensus engine (spec §7).
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("frame did not decode: {0}")]
    MalformedFrame(#[from] CodecError),
    #[error("no permitted signer matched this block's signature")]
    UnknownSigner,
    #[error("signature did not verify")]
    BadSignature,
    #[error("systemic transaction kind is not legal in round {0}")]
    OutOfRound(crate::round::Round),
    #[error("duplicate systemic transaction from signer for this era")]
    DuplicateSystemic,
    #[error("block references an unknown parent hash")]
    MissingAncestor,
    #[error("insufficient entropy contributions to seed the next era")]
    UnseededEra,
}

impl ErrorCode for ConsensusError {
    fn code(&self) -> &'static str {
        match self {
            Self::MalformedFrame(_) => "CONSENSUS_MALFORMED_FRAME",
            Self::UnknownSigner => "CONSENSUS_UNKNOWN_SIGNER",
            Self::BadSignature => "CONSENSUS_BAD_SIGNATURE",
            Self::OutOfRound(_) => "CONSENSUS_OUT_OF_ROUND",
            Self::DuplicateSystemic => "CONSENSUS_DUPLICATE_SYSTEMIC",
            Self::MissingAncestor => "CONSENSUS_MISSING_ANCESTOR",
            Self::UnseededEra => "CONSENSUS_UNSEEDED_ERA",
        }
    }
}
