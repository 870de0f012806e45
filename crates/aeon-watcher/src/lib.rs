//! Conflict watcher (spec §4.4): records which signer produced which block
//! in which epoch, surfaces equivocations, and partitions a merge window
//! into already-settled conflicts versus candidates for longest-chain
//! tie-breaking.

use std::collections::{HashMap, HashSet};

use aeon_api::BlockStore;
use aeon_epoch::timeslot_of;
use aeon_types::{Hash, PublicKey};

/// Blocks grouped by whether their conflicts were already resolved by an
/// earlier, out-of-window equivocation (`explicit`) or still need
/// longest-chain disambiguation (`candidates`, one inner `Vec` per
/// disjoint conflict group).
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ConflictPartition {
    pub explicit: Vec<Hash>,
    pub candidates: Vec<Vec<Hash>>,
}

#[derive(Debug, Default)]
pub struct ConflictWatcher {
    blocks_by_hash: HashMap<Hash, (PublicKey, u64)>,
    by_epoch: HashMap<u64, HashMap<PublicKey, Vec<Hash>>>,
}

impl ConflictWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `signer` produced `hash` in `epoch_number`.
    pub fn on_new_block(&mut self, hash: Hash, epoch_number: u64, signer: PublicKey) {
        self.blocks_by_hash.insert(hash, (signer, epoch_number));
        self.by_epoch
            .entry(epoch_number)
            .or_default()
            .entry(signer)
            .or_default()
            .push(hash);

        if let Some(conflicts) = self.conflicts_of_nonempty(&hash) {
            tracing::warn!(
                hash = %hex::encode(hash),
                count = conflicts.len(),
                "equivocation detected: signer produced conflicting blocks this epoch"
            );
        }
    }

    /// The other hashes the same signer produced in the same epoch as
    /// `hash`, or an empty vec if `hash` is unknown or has no conflicts.
    pub fn conflicts_of(&self, hash: &Hash) -> Vec<Hash> {
        self.conflicts_of_nonempty(hash).unwrap_or_default()
    }

    /// `true` if `hash` has been recorded via [`ConflictWatcher::on_new_block`].
    /// Used to validate that a `PenaltyTransaction` only cites block hashes
    /// the watcher actually knows about.
    pub fn is_known(&self, hash: &Hash) -> bool {
        self.blocks_by_hash.contains_key(hash)
    }

    fn conflicts_of_nonempty(&self, hash: &Hash) -> Option<Vec<Hash>> {
        let (signer, epoch) = self.blocks_by_hash.get(hash)?;
        let siblings = self.by_epoch.get(epoch)?.get(signer)?;
        let others: Vec<Hash> = siblings.iter().copied().filter(|h| h != hash).collect();
        if others.is_empty() {
            None
        } else {
            Some(others)
        }
    }

    /// Partitions the merge window between `common_ancestor` and `tops`
    /// (spec §4.4): for every block from `ancestor.timeslot` through the
    /// latest top's timeslot, any conflict that reaches further back than
    /// the window is already settled (`explicit`); everything else forms
    /// a `candidates` group awaiting longest-chain resolution.
    pub fn find_conflicts_between<B: BlockStore>(
        &self,
        store: &B,
        tops: &[Hash],
        common_ancestor: Hash,
        params: &aeon_api::ConsensusParams,
    ) -> ConflictPartition {
        let Some(ancestor_block) = store.get(&common_ancestor) else {
            return ConflictPartition::default();
        };
        let ancestor_ts = timeslot_of(ancestor_block.block.timestamp, params);

        let max_top_ts = tops
            .iter()
            .filter_map(|t| store.get(t))
            .map(|b| timeslot_of(b.block.timestamp, params))
            .max()
            .unwrap_or(ancestor_ts);

        let window_blocks = self.collect_window(store, tops, ancestor_ts, params);

        let mut explicit: HashSet<Hash> = HashSet::new();
        let mut seen_groups: HashSet<Vec<Hash>> = HashSet::new();
        let mut candidates: Vec<Vec<Hash>> = Vec::new();

        for b in &window_blocks {
            let conflicts = self.conflicts_of(b);
            if conflicts.is_empty() {
                continue;
            }

            let mut inside_merge = Vec::new();
            let mut has_earlier_out_of_range = false;
            for c in &conflicts {
                let Some(cb) = store.get(c) else { continue };
                let cts = timeslot_of(cb.block.timestamp, params);
                if cts < ancestor_ts {
                    has_earlier_out_of_range = true;
                } else if cts > max_top_ts {
                    // out of window on the future side; ignored per spec.
                } else {
                    inside_merge.push(*c);
                }
            }

            if has_earlier_out_of_range {
                explicit.insert(*b);
                explicit.extend(inside_merge);
            } else if !inside_merge.is_empty() {
                let mut group = inside_merge;
                group.push(*b);
                group.sort();
                group.dedup();
                if seen_groups.insert(group.clone()) {
                    candidates.push(group);
                }
            }
        }

        ConflictPartition {
            explicit: explicit.into_iter().collect(),
            candidates,
        }
    }

    fn collect_window<B: BlockStore>(
        &self,
        store: &B,
        tops: &[Hash],
        floor_ts: u64,
        params: &aeon_api::ConsensusParams,
    ) -> HashSet<Hash> {
        let mut seen = HashSet::new();
        let mut out = HashSet::new();
        let mut stack: Vec<Hash> = tops.to_vec();
        while let Some(h) = stack.pop() {
            if !seen.insert(h) {
                continue;
            }
            let Some(block) = store.get(&h) else { continue };
            let ts = timeslot_of(block.block.timestamp, params);
            if ts < floor_ts {
                continue;
            }
            out.insert(h);
            stack.extend(block.block.prev_hashes.iter().copied());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeon_api::ConsensusParams;
    use aeon_types::{Block, SignedBlock, Signature};
    use std::collections::HashMap as StdHashMap;

    #[derive(Default)]
    struct FakeStore {
        blocks: StdHashMap<Hash, SignedBlock>,
    }

    impl BlockStore for FakeStore {
        fn get(&self, hash: &Hash) -> Option<&SignedBlock> {
            self.blocks.get(hash)
        }
        fn by_timeslot(&self, _timeslot: u64) -> Vec<Hash> {
            Vec::new()
        }
        fn tops(&self) -> Vec<Hash> {
            self.blocks.keys().copied().collect()
        }
    }

    fn sig() -> Signature {
        Signature::from_slice(&[1u8; Signature::LEN]).unwrap()
    }

    fn pubkey(byte: u8) -> PublicKey {
        PublicKey::from_slice(&[byte; PublicKey::LEN]).unwrap()
    }

    fn hash_of(n: u8) -> Hash {
        [n; 32]
    }

    fn insert(store: &mut FakeStore, hash: Hash, prev: Vec<Hash>, timestamp: u32) {
        store.blocks.insert(
            hash,
            SignedBlock {
                block: Block {
                    prev_hashes: prev,
                    timestamp,
                    systemic_txs: vec![],
                    payment_txs: vec![],
                },
                signature: sig(),
            },
        );
    }

    #[test]
    fn is_known_reflects_recorded_blocks_only() {
        let mut watcher = ConflictWatcher::new();
        watcher.on_new_block(hash_of(1), 0, pubkey(1));
        assert!(watcher.is_known(&hash_of(1)));
        assert!(!watcher.is_known(&hash_of(2)));
    }

    #[test]
    fn no_conflicts_for_a_lone_block() {
        let watcher = ConflictWatcher::new();
        assert!(watcher.conflicts_of(&hash_of(1)).is_empty());
    }

    #[test]
    fn same_signer_same_epoch_conflicts() {
        let mut watcher = ConflictWatcher::new();
        let signer = pubkey(1);
        watcher.on_new_block(hash_of(1), 0, signer);
        watcher.on_new_block(hash_of(2), 0, signer);
        assert_eq!(watcher.conflicts_of(&hash_of(1)), vec![hash_of(2)]);
        assert_eq!(watcher.conflicts_of(&hash_of(2)), vec![hash_of(1)]);
    }

    #[test]
    fn different_epochs_do_not_conflict() {
        let mut watcher = ConflictWatcher::new();
        let signer = pubkey(1);
        watcher.on_new_block(hash_of(1), 0, signer);
        watcher.on_new_block(hash_of(2), 1, signer);
        assert!(watcher.conflicts_of(&hash_of(1)).is_empty());
    }

    #[test]
    fn different_signers_do_not_conflict() {
        let mut watcher = ConflictWatcher::new();
        watcher.on_new_block(hash_of(1), 0, pubkey(1));
        watcher.on_new_block(hash_of(2), 0, pubkey(2));
        assert!(watcher.conflicts_of(&hash_of(1)).is_empty());
    }

    #[test]
    fn equivocation_in_window_becomes_a_candidate_group() {
        let mut store = FakeStore::default();
        let ancestor = hash_of(10);
        insert(&mut store, ancestor, vec![], 0);
        let a = hash_of(11);
        let b = hash_of(12);
        insert(&mut store, a, vec![ancestor], 5);
        insert(&mut store, b, vec![ancestor], 5);

        let mut watcher = ConflictWatcher::new();
        let signer = pubkey(1);
        watcher.on_new_block(a, 1, signer);
        watcher.on_new_block(b, 1, signer);

        let params = ConsensusParams::default();
        let partition = watcher.find_conflicts_between(&store, &[a, b], ancestor, &params);
        assert!(partition.explicit.is_empty());
        assert_eq!(partition.candidates.len(), 1);
        let mut group = partition.candidates[0].clone();
        group.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(group, expected);
    }
}
