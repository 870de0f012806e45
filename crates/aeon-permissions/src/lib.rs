//! Permission computation (spec §4.2): a pure function of
//! `(entropy_seed, active_validator_set_with_stake)` that deterministically
//! shuffles the validator list into the per-timeslot signer schedule, the
//! per-round randomizer committees, and the per-block gossip-answerer
//! schedule.
//!
//! Stake is accepted as part of the input (spec §1: the stake mutation
//! transactions are only aggregated, never interpreted here) but does not
//! currently weight the shuffle — every active validator gets exactly one
//! slot in the base permutation regardless of stake size, matching the
//! "deterministic Fisher-Yates-style shuffle of the validator list"
//! wording in §4.2, which describes a shuffle over the validator *list*,
//! not a stake-weighted lottery.

pub mod error;

use aeon_crypto::sha256;
use aeon_types::{PublicKey, Round, Validator};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub use error::PermissionsError;

/// The three independent orderings derived from one entropy seed, plus the
/// committee-window size used to carve rounds/blocks out of them.
#[derive(Debug, Clone)]
pub struct Permissions {
    signer_order: Vec<PublicKey>,
    randomizer_order: Vec<PublicKey>,
    gossip_order: Vec<PublicKey>,
    secret_sharers: Vec<PublicKey>,
    committers: Vec<PublicKey>,
    round_duration: usize,
}

const SALT_SIGNERS: u8 = 0;
const SALT_RANDOMIZERS: u8 = 1;
const SALT_GOSSIP: u8 = 2;

fn shuffled(seed: &[u8; 32], salt: u8, validators: &[Validator]) -> Vec<PublicKey> {
    let rng_seed = sha256(&[seed.as_slice(), &[salt]].concat());
    let mut rng = StdRng::from_seed(rng_seed);
    let mut order: Vec<PublicKey> = validators.iter().map(|v| v.pubkey).collect();
    order.shuffle(&mut rng);
    order
}

/// A window of `size` entries from `order`, starting at `offset`, wrapping
/// around the end. Used any time the era has more timeslots/rounds than
/// there are validators to give each a distinct slot.
fn window(order: &[PublicKey], offset: usize, size: usize) -> Vec<PublicKey> {
    let n = order.len();
    (0..size).map(|i| order[(offset + i) % n]).collect()
}

impl Permissions {
    /// Computes the full permission schedule for an epoch hash's entropy
    /// seed and active validator set. `round_duration` is the number of
    /// timeslots per round (`ConsensusParams::round_duration`).
    pub fn compute(
        seed: [u8; 32],
        validators: &[Validator],
        round_duration: u64,
    ) -> Result<Self, PermissionsError> {
        if validators.is_empty() {
            return Err(PermissionsError::NoActiveValidators);
        }
        Ok(Permissions {
            signer_order: shuffled(&seed, SALT_SIGNERS, validators),
            randomizer_order: shuffled(&seed, SALT_RANDOMIZERS, validators),
            gossip_order: shuffled(&seed, SALT_GOSSIP, validators),
            secret_sharers: validators.iter().map(|v| v.pubkey).collect(),
            committers: validators.iter().map(|v| v.pubkey).collect(),
            round_duration: round_duration as usize,
        })
    }

    /// The unique public key allowed to sign timeslot `in_epoch_block_number`.
    pub fn sign_permission(&self, in_epoch_block_number: u64) -> PublicKey {
        self.signer_order[in_epoch_block_number as usize % self.signer_order.len()]
    }

    /// The in-epoch block numbers (within one cycle of the base
    /// permutation) this key is permitted to sign at. The inverse of
    /// [`Permissions::sign_permission`].
    pub fn sign_index_of(&self, pubkey: &PublicKey) -> Option<usize> {
        self.signer_order.iter().position(|p| p == pubkey)
    }

    /// Ordered committee of size `round_duration` permitted to act as
    /// randomizers for `round`.
    pub fn randomizer_pubkeys_for_round(&self, round: Round) -> Vec<PublicKey> {
        let offset = round.index() as usize * self.round_duration;
        window(&self.randomizer_order, offset, self.round_duration)
    }

    pub fn is_randomizer_for_round(&self, round: Round, pubkey: &PublicKey) -> bool {
        self.randomizer_pubkeys_for_round(round).contains(pubkey)
    }

    /// The public key occupying `index` in the active validator set this
    /// permission schedule was computed over (the same order
    /// `signer_index` fields in `PublicKeyTransaction`/`SplitRandomTransaction`/
    /// `CommitRandomTransaction` index into). `None` if `index` is out of
    /// range for the validator set.
    pub fn pubkey_at_index(&self, index: u32) -> Option<PublicKey> {
        self.committers.get(index as usize).copied()
    }

    /// The inverse of [`Permissions::pubkey_at_index`]: the validator-set
    /// index a node must use as `signer_index` when it emits a
    /// `PublicKeyTransaction`/`SplitRandomTransaction`/`CommitRandomTransaction`.
    pub fn index_of(&self, pubkey: &PublicKey) -> Option<u32> {
        self.committers.iter().position(|p| p == pubkey).map(|i| i as u32)
    }

    /// Size of the active validator set this schedule was computed over.
    pub fn validator_count(&self) -> usize {
        self.committers.len()
    }

    /// Every public key permitted to emit a `SplitRandomTransaction`.
    pub fn secret_sharers(&self) -> &[PublicKey] {
        &self.secret_sharers
    }

    pub fn is_secret_sharer(&self, pubkey: &PublicKey) -> bool {
        self.secret_sharers.contains(pubkey)
    }

    /// Every public key permitted to emit a `CommitRandomTransaction`.
    pub fn committers(&self) -> &[PublicKey] {
        &self.committers
    }

    pub fn is_committer(&self, pubkey: &PublicKey) -> bool {
        self.committers.contains(pubkey)
    }

    /// Public keys permitted to emit negative gossip for timeslot
    /// `in_epoch_block_number`.
    pub fn gossip_permission(&self, in_epoch_block_number: u64) -> Vec<PublicKey> {
        let offset = in_epoch_block_number as usize * self.round_duration;
        window(&self.gossip_order, offset, self.round_duration)
    }

    pub fn is_gossip_permitted(&self, in_epoch_block_number: u64, pubkey: &PublicKey) -> bool {
        self.gossip_permission(in_epoch_block_number).contains(pubkey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validators(n: usize) -> Vec<Validator> {
        (0..n)
            .map(|i| Validator {
                pubkey: PublicKey::from_slice(&[i as u8 + 1; PublicKey::LEN]).unwrap(),
                stake: 100,
            })
            .collect()
    }

    #[test]
    fn same_seed_and_set_is_fully_deterministic() {
        let seed = [5u8; 32];
        let vs = validators(5);
        let a = Permissions::compute(seed, &vs, 2).unwrap();
        let b = Permissions::compute(seed, &vs, 2).unwrap();
        assert_eq!(a.sign_permission(0), b.sign_permission(0));
        assert_eq!(a.randomizer_pubkeys_for_round(Round::Commit), b.randomizer_pubkeys_for_round(Round::Commit));
    }

    #[test]
    fn different_seeds_usually_diverge() {
        let vs = validators(5);
        let a = Permissions::compute([1u8; 32], &vs, 2).unwrap();
        let b = Permissions::compute([2u8; 32], &vs, 2).unwrap();
        assert_ne!(a.signer_order, b.signer_order);
    }

    #[test]
    fn every_validator_gets_exactly_one_signer_slot_per_cycle() {
        let vs = validators(4);
        let perms = Permissions::compute([9u8; 32], &vs, 2).unwrap();
        let mut assigned: Vec<PublicKey> = (0..4).map(|i| perms.sign_permission(i)).collect();
        assigned.sort();
        let mut expected: Vec<PublicKey> = vs.iter().map(|v| v.pubkey).collect();
        expected.sort();
        assert_eq!(assigned, expected);
    }

    #[test]
    fn sign_index_is_the_inverse_of_sign_permission() {
        let vs = validators(4);
        let perms = Permissions::compute([3u8; 32], &vs, 2).unwrap();
        let key = perms.sign_permission(2);
        let idx = perms.sign_index_of(&key).unwrap();
        assert_eq!(perms.sign_permission(idx as u64), key);
    }

    #[test]
    fn randomizer_committee_has_round_duration_entries() {
        let vs = validators(6);
        let perms = Permissions::compute([1u8; 32], &vs, 2).unwrap();
        assert_eq!(perms.randomizer_pubkeys_for_round(Round::Public).len(), 2);
    }

    #[test]
    fn empty_validator_set_is_rejected() {
        assert!(matches!(
            Permissions::compute([0u8; 32], &[], 2),
            Err(PermissionsError::NoActiveValidators)
        ));
    }

    #[test]
    fn pubkey_at_index_matches_input_order() {
        let vs = validators(3);
        let perms = Permissions::compute([4u8; 32], &vs, 2).unwrap();
        assert_eq!(perms.validator_count(), 3);
        assert_eq!(perms.pubkey_at_index(1), Some(vs[1].pubkey));
        assert_eq!(perms.pubkey_at_index(3), None);
    }
}
