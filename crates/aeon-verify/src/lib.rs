//! Three-tier transaction and block acceptance (spec §4.6, §7):
//!
//! - [`mempool_acceptor::MempoolAcceptor`] — cheap admission into the
//!   mempool: signature, committee membership, per-era rate limit.
//! - [`in_block_acceptor::InBlockAcceptor`] — stricter checks once a
//!   transaction sits in a specific block at a specific round.
//! - [`block_acceptor::BlockAcceptor`] — block-structural acceptance:
//!   known parents, timeslot consistency, signer recovery.

pub mod block_acceptor;
pub mod dedup;
pub mod error;
pub mod in_block_acceptor;
pub mod mempool_acceptor;

pub use block_acceptor::BlockAcceptor;
pub use dedup::EraDuplicateTracker;
pub use error::VerifyError;
pub use in_block_acceptor::InBlockAcceptor;
pub use mempool_acceptor::MempoolAcceptor;

use aeon_permissions::Permissions;
use aeon_types::PublicKey;

/// Resolves a `signer_index` field against the active permission schedule's
/// validator set, shared by every acceptor that validates a `PublicKeyTransaction`,
/// `SplitRandomTransaction`, or `CommitRandomTransaction`.
pub(crate) fn signer_index_pubkey(
    permissions: &Permissions,
    signer_index: u32,
) -> Result<PublicKey, VerifyError> {
    permissions
        .pubkey_at_index(signer_index)
        .ok_or(VerifyError::NotInCommittee)
}
