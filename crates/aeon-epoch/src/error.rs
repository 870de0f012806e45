use aeon_types::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EpochError {
    #[error("no ancestor of {0} carries an epoch hash")]
    NoEpochHash(String),
    #[error("insufficient entropy contributions to seed the next era")]
    UnseededEra,
}

impl ErrorCode for EpochError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoEpochHash(_) => "EPOCH_NO_EPOCH_HASH",
            Self::UnseededEra => "EPOCH_UNSEEDED_ERA",
        }
    }
}
