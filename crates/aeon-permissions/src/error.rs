use aeon_types::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PermissionsError {
    #[error("cannot compute permissions over an empty validator set")]
    NoActiveValidators,
}

impl ErrorCode for PermissionsError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoActiveValidators => "PERMISSIONS_NO_ACTIVE_VALIDATORS",
        }
    }
}
