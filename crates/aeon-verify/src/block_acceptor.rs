//! Block-structural acceptance (spec §4.6(c)): the checks run against a
//! freshly received `SignedBlock` before it is handed to `aeon-dag`.
//!
//! Signer verification tries each public key the permission schedule allows
//! at this timeslot and accepts the first match (spec §3's "tries each of
//! the small set of candidate public keys"), since a `SignedBlock` carries
//! no explicit signer identity of its own.

use aeon_api::ConsensusParams;
use aeon_crypto::verify as crypto_verify;
use aeon_epoch::timeslot_of;
use aeon_permissions::Permissions;
use aeon_types::{Hash, SignedBlock};

use crate::error::VerifyError;

pub struct BlockAcceptor;

impl BlockAcceptor {
    /// Every hash in `block.prev_hashes` must already be known to the DAG.
    /// `known` answers whether a given hash has been inserted.
    pub fn parents_known(
        block: &SignedBlock,
        known: impl Fn(&Hash) -> bool,
    ) -> Result<(), VerifyError> {
        if block.block.prev_hashes.iter().all(|h| known(h)) {
            Ok(())
        } else {
            Err(VerifyError::MissingAncestor)
        }
    }

    /// The block's timestamp must quantize to the timeslot its sender
    /// claims to be producing for.
    pub fn timeslot_matches(
        block: &SignedBlock,
        expected_timeslot: u64,
        params: &ConsensusParams,
    ) -> Result<(), VerifyError> {
        let actual = timeslot_of(block.block.timestamp, params);
        if actual == expected_timeslot {
            Ok(())
        } else {
            Err(VerifyError::TimestampMismatch)
        }
    }

    /// Verifies the block's signature against every public key permitted to
    /// sign `in_epoch_block_number`, returning the matching key.
    pub fn verify_signer(
        block: &SignedBlock,
        in_epoch_block_number: u64,
        permissions: &Permissions,
        block_hash: &Hash,
    ) -> Result<aeon_types::PublicKey, VerifyError> {
        let candidate = permissions.sign_permission(in_epoch_block_number);
        crypto_verify(&candidate, block_hash, &block.signature)
            .map(|_| candidate)
            .map_err(|_| VerifyError::UnknownSigner)
    }

    /// Runs every structural check for a block whose epoch (and therefore
    /// permission schedule and expected timeslot) is already known. Callers
    /// buffering orphans with unknown parents should call
    /// [`BlockAcceptor::parents_known`] and [`BlockAcceptor::timeslot_matches`]
    /// only, deferring [`BlockAcceptor::verify_signer`] until the epoch
    /// context can be resolved.
    pub fn accept(
        block: &SignedBlock,
        block_hash: &Hash,
        expected_timeslot: u64,
        in_epoch_block_number: u64,
        params: &ConsensusParams,
        permissions: &Permissions,
        known: impl Fn(&Hash) -> bool,
    ) -> Result<aeon_types::PublicKey, VerifyError> {
        Self::parents_known(block, known)?;
        Self::timeslot_matches(block, expected_timeslot, params)?;
        Self::verify_signer(block, in_epoch_block_number, permissions, block_hash)
    }
}
