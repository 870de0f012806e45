//! Epoch state machine: timeslot/round arithmetic, epoch-hash bookkeeping,
//! and entropy seed derivation (spec §4.1).

pub mod clock;
pub mod error;
pub mod seed;

use std::collections::HashMap;

use aeon_api::{BlockStore, ConsensusParams};
use aeon_types::{Hash, Round};

pub use clock::{epoch_number_of, in_epoch_block_number, is_new_epoch_upcoming, round_of, timeslot_of};
pub use error::EpochError;
pub use seed::{blocks_in_era, derive_era_seed, fallback_seed};

/// Tracks, per fork, which block hash is currently acting as the epoch
/// hash, and the entropy seed each epoch hash carries forward.
///
/// Kept generic over `BlockStore` so it can be unit tested against an
/// in-memory fake without depending on `aeon-dag`.
#[derive(Debug, Default)]
pub struct EpochTracker {
    /// epoch_hash -> the seed it contributes to the era it opens.
    seeds: HashMap<Hash, [u8; 32]>,
}

impl EpochTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the DAG's current tops as this era's epoch hashes, and
    /// derive an entropy seed for the era that just ended along each of
    /// those forks. Call exactly once per era, at the first timeslot
    /// where [`is_new_epoch_upcoming`] holds.
    pub fn accept_tops_as_epoch_hashes<B: BlockStore>(
        &mut self,
        store: &B,
        active_validator_count: usize,
        params: &ConsensusParams,
    ) {
        for top in store.tops() {
            if self.seeds.contains_key(&top) {
                continue;
            }
            let seed = self.derive_seed_for_epoch_hash(store, &top, active_validator_count, params);
            self.seeds.insert(top, seed);
        }
    }

    /// The mapping `top_hash -> epoch_hash` for every current DAG top,
    /// where `epoch_hash` is whatever ancestor block is seeding the
    /// permissions currently active along that fork.
    pub fn get_epoch_hashes<B: BlockStore>(&self, store: &B, params: &ConsensusParams) -> HashMap<Hash, Hash> {
        store
            .tops()
            .into_iter()
            .filter_map(|top| {
                self.find_epoch_hash_for_block(store, &top, params)
                    .map(|epoch_hash| (top, epoch_hash))
            })
            .collect()
    }

    /// Walks ancestors of `block_hash` until it hits a block whose
    /// timeslot falls in the previous era's FINAL round; that block's hash
    /// is the epoch hash governing `block_hash`.
    pub fn find_epoch_hash_for_block<B: BlockStore>(
        &self,
        store: &B,
        block_hash: &Hash,
        params: &ConsensusParams,
    ) -> Option<Hash> {
        let target = store.get(block_hash)?;
        let target_era = epoch_number_of(timeslot_of(target.block.timestamp, params), params);

        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![*block_hash];
        while let Some(h) = stack.pop() {
            if !seen.insert(h) {
                continue;
            }
            let block = store.get(&h)?;
            let ts = timeslot_of(block.block.timestamp, params);
            if round_of(ts, params) == Round::Final && epoch_number_of(ts, params) < target_era {
                return Some(h);
            }
            stack.extend(block.block.prev_hashes.iter().copied());
        }
        None
    }

    /// Same walk as [`EpochTracker::find_epoch_hash_for_block`], but for a
    /// block that has not been inserted yet: starts from `parent_hash`
    /// (included) and targets the era containing `child_timeslot` instead of
    /// reading the target era off an already-stored block. Lets a node
    /// resolve the permission schedule governing an incoming or
    /// about-to-be-signed block before it exists in the store.
    pub fn epoch_hash_for_new_block<B: BlockStore>(
        &self,
        store: &B,
        parent_hash: &Hash,
        child_timeslot: u64,
        params: &ConsensusParams,
    ) -> Option<Hash> {
        let child_era = epoch_number_of(child_timeslot, params);

        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![*parent_hash];
        while let Some(h) = stack.pop() {
            if !seen.insert(h) {
                continue;
            }
            let block = store.get(&h)?;
            let ts = timeslot_of(block.block.timestamp, params);
            if round_of(ts, params) == Round::Final && epoch_number_of(ts, params) < child_era {
                return Some(h);
            }
            stack.extend(block.block.prev_hashes.iter().copied());
        }
        None
    }

    /// The entropy seed belonging to `epoch_hash`, if it has been derived.
    pub fn seed_for(&self, epoch_hash: &Hash) -> Option<[u8; 32]> {
        self.seeds.get(epoch_hash).copied()
    }

    fn derive_seed_for_epoch_hash<B: BlockStore>(
        &self,
        store: &B,
        epoch_hash: &Hash,
        active_validator_count: usize,
        params: &ConsensusParams,
    ) -> [u8; 32] {
        let Some(epoch_block) = store.get(epoch_hash) else {
            return [0u8; 32];
        };
        let era_number = epoch_number_of(timeslot_of(epoch_block.block.timestamp, params), params);

        let prev_epoch_hash = self.find_epoch_hash_for_block(store, epoch_hash, params);
        let prev_seed = prev_epoch_hash
            .and_then(|h| self.seeds.get(&h).copied())
            .unwrap_or([0u8; 32]);

        let ancestors = collect_ancestors(store, epoch_hash);
        let ancestor_blocks: Vec<_> = ancestors.iter().filter_map(|h| store.get(h)).collect();
        let era_blocks = blocks_in_era(&ancestor_blocks, era_number, params);

        match derive_era_seed(&era_blocks, active_validator_count) {
            Some(seed) => seed,
            None => {
                tracing::warn!(era_number, "era unseeded, using fallback ordering");
                fallback_seed(&prev_seed, era_number)
            }
        }
    }
}

fn collect_ancestors<B: BlockStore>(store: &B, start: &Hash) -> Vec<Hash> {
    let mut seen = std::collections::HashSet::new();
    let mut stack = vec![*start];
    let mut out = Vec::new();
    while let Some(h) = stack.pop() {
        if !seen.insert(h) {
            continue;
        }
        out.push(h);
        if let Some(block) = store.get(&h) {
            stack.extend(block.block.prev_hashes.iter().copied());
        }
    }
    out
}

/// `EntropySource` impl so `aeon-permissions` can consume an `EpochTracker`
/// through the shared trait seam.
impl aeon_api::EntropySource for EpochTracker {
    fn seed_for(&self, epoch_hash: &Hash) -> Option<[u8; 32]> {
        EpochTracker::seed_for(self, epoch_hash)
    }
}
