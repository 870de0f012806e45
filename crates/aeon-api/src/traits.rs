//! Trait seams that let `aeon-epoch` and `aeon-permissions` be reasoned
//! about and tested without linking against a concrete `aeon-dag::Dag`,
//! the same way `ioi_api::chain::ChainView` decouples `ioi-consensus` from
//! any one state-manager backend.

pub use aeon_types::Round;
use aeon_types::{Hash, SignedBlock, Validator};

/// Read-only view over whatever is holding the DAG's two indices.
///
/// Implemented by `aeon_dag::Dag`; kept as a trait so the epoch module can
/// be unit tested against an in-memory fake without depending on the DAG
/// crate.
pub trait BlockStore {
    fn get(&self, hash: &Hash) -> Option<&SignedBlock>;
    /// Hashes of every block whose `timestamp` field equals `timestamp_value`
    /// exactly. The store has no notion of `ConsensusParams` of its own, so
    /// this takes the raw unix timestamp a block at some timeslot would
    /// carry (`genesis_timestamp + timeslot * block_time_secs`), not the
    /// abstract timeslot index itself — callers convert.
    fn by_timeslot(&self, timestamp_value: u64) -> Vec<Hash>;
    fn tops(&self) -> Vec<Hash>;
}

/// Supplies the entropy seed fixed for a given epoch hash, once derived.
pub trait EntropySource {
    fn seed_for(&self, epoch_hash: &Hash) -> Option<[u8; 32]>;
}

/// Supplies the active, staked validator set as of a given epoch hash.
/// This is a static input to the permission computation (spec §1): this
/// crate does not mutate stake, only reads it.
pub trait StakeView {
    fn active_validators(&self, epoch_hash: &Hash) -> Vec<Validator>;
}
