use aeon_types::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DagError {
    #[error("block {0} already present")]
    AlreadyPresent(String),
    #[error("block references an unknown parent hash")]
    MissingAncestor,
}

impl ErrorCode for DagError {
    fn code(&self) -> &'static str {
        match self {
            Self::AlreadyPresent(_) => "DAG_ALREADY_PRESENT",
            Self::MissingAncestor => "DAG_MISSING_ANCESTOR",
        }
    }
}
