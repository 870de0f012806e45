//! The block DAG (spec §3, §4.3): insertion, hash/timeslot indices, tops,
//! ancestor walks, and branch intersection for fork resolution.
//!
//! Blocks are keyed by their own hash and additionally indexed by the
//! timeslot their timestamp quantizes to (`aeon-epoch` owns the
//! timestamp-to-timeslot arithmetic; this crate just buckets on the raw
//! `u32` timestamp since every admitted block's timestamp already sits on
//! a timeslot boundary by construction).

pub mod error;

use std::collections::{HashMap, HashSet};

use aeon_api::BlockStore;
use aeon_codec::hash_block;
use aeon_types::{Hash, SignedBlock};

pub use error::DagError;

/// An in-memory DAG of signed blocks.
///
/// `tops` tracks every inserted block that is not yet cited as a parent by
/// another inserted block — the DAG's frontier. A genesis block (empty
/// `prev_hashes`) is the only block allowed to have no known ancestors.
#[derive(Debug, Default)]
pub struct Dag {
    blocks: HashMap<Hash, SignedBlock>,
    by_timestamp: HashMap<u32, Vec<Hash>>,
    tops: HashSet<Hash>,
}

impl Dag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a signed block, returning its hash. Returns
    /// [`DagError::MissingAncestor`] if any non-genesis parent is unknown,
    /// and [`DagError::AlreadyPresent`] if the hash is already stored
    /// (equivocation detection happens one layer up, in `aeon-watcher`;
    /// the DAG itself is a plain content-addressed store).
    pub fn insert(&mut self, signed: SignedBlock) -> Result<Hash, DagError> {
        let hash = hash_block(&signed.block);
        if self.blocks.contains_key(&hash) {
            return Err(DagError::AlreadyPresent(hex::encode(hash)));
        }
        if !signed.block.prev_hashes.is_empty() {
            for parent in &signed.block.prev_hashes {
                if !self.blocks.contains_key(parent) {
                    return Err(DagError::MissingAncestor);
                }
            }
        }

        for parent in &signed.block.prev_hashes {
            self.tops.remove(parent);
        }
        self.tops.insert(hash);

        let timestamp = signed.block.timestamp;
        self.by_timestamp.entry(timestamp).or_default().push(hash);
        self.blocks.insert(hash, signed);

        tracing::debug!(hash = %hex::encode(hash), "inserted block into dag");
        Ok(hash)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.blocks.contains_key(hash)
    }

    /// Walks ancestors of `hash` breadth-first, including `hash` itself,
    /// stopping at genesis or unknown hashes.
    pub fn ancestors(&self, hash: &Hash) -> Vec<Hash> {
        let mut seen = HashSet::new();
        let mut stack = vec![*hash];
        let mut out = Vec::new();
        while let Some(h) = stack.pop() {
            if !seen.insert(h) {
                continue;
            }
            out.push(h);
            if let Some(block) = self.blocks.get(&h) {
                stack.extend(block.block.prev_hashes.iter().copied());
            }
        }
        out
    }

    /// Walks backward from `hash` until it reaches a block whose timestamp
    /// satisfies `predicate`, returning that block's hash. Used by
    /// `aeon-epoch` to locate the epoch hash governing a block (spec
    /// §4.1: walk ancestors until a block in the previous era's final
    /// round).
    pub fn find_ancestor(&self, hash: &Hash, predicate: impl Fn(&SignedBlock) -> bool) -> Option<Hash> {
        let mut seen = HashSet::new();
        let mut stack = vec![*hash];
        while let Some(h) = stack.pop() {
            if !seen.insert(h) {
                continue;
            }
            let block = self.blocks.get(&h)?;
            if predicate(block) {
                return Some(h);
            }
            stack.extend(block.block.prev_hashes.iter().copied());
        }
        None
    }

    /// Blocks belonging to both ancestor sets of `left` and `right` but not
    /// to their common ancestor set — i.e. everything on the two branches
    /// strictly after they diverged. Returned as `(left_only, right_only)`,
    /// handed to `aeon-watcher` to partition into equivocations vs.
    /// longest-chain candidates.
    pub fn branches_since_divergence(&self, left: &Hash, right: &Hash) -> (Vec<Hash>, Vec<Hash>) {
        let left_ancestors: HashSet<Hash> = self.ancestors(left).into_iter().collect();
        let right_ancestors: HashSet<Hash> = self.ancestors(right).into_iter().collect();
        let left_only = left_ancestors.difference(&right_ancestors).copied().collect();
        let right_only = right_ancestors.difference(&left_ancestors).copied().collect();
        (left_only, right_only)
    }

    /// Every stored block whose timestamp falls within `[start, end)`,
    /// across every branch — used to find branches intersecting a
    /// timeslot range (spec component 3).
    pub fn blocks_in_range(&self, start: u32, end: u32) -> Vec<Hash> {
        self.by_timestamp
            .iter()
            .filter(|(ts, _)| **ts >= start && **ts < end)
            .flat_map(|(_, hashes)| hashes.iter().copied())
            .collect()
    }

    /// One hash per maximal connected branch whose head falls in
    /// `[timeslot_low, timeslot_high)`: every block in the window that is
    /// not itself cited as a parent by another block also in the window.
    pub fn branches_intersecting(&self, timeslot_low: u32, timeslot_high: u32) -> Vec<Hash> {
        let in_range: HashSet<Hash> = self
            .blocks_in_range(timeslot_low, timeslot_high)
            .into_iter()
            .collect();
        let mut referenced: HashSet<Hash> = HashSet::new();
        for h in &in_range {
            if let Some(block) = self.blocks.get(h) {
                for parent in &block.block.prev_hashes {
                    if in_range.contains(parent) {
                        referenced.insert(*parent);
                    }
                }
            }
        }
        in_range.difference(&referenced).copied().collect()
    }

    /// The longest ancestor chain by block count among `tops`, ties broken
    /// toward the lexicographically smaller hash.
    pub fn longest_chain_top(&self, tops: &[Hash]) -> Option<Hash> {
        let mut memo = HashMap::new();
        tops.iter()
            .copied()
            .max_by(|a, b| {
                let da = self.chain_depth(a, &mut memo);
                let db = self.chain_depth(b, &mut memo);
                da.cmp(&db).then_with(|| b.cmp(a))
            })
    }

    /// Longest path length (in blocks) from `hash` back to a block with no
    /// known parents, memoized since forks reconverge and would otherwise
    /// be recomputed many times.
    fn chain_depth(&self, hash: &Hash, memo: &mut HashMap<Hash, usize>) -> usize {
        if let Some(&d) = memo.get(hash) {
            return d;
        }
        let depth = match self.blocks.get(hash) {
            Some(block) if !block.block.prev_hashes.is_empty() => {
                1 + block
                    .block
                    .prev_hashes
                    .iter()
                    .map(|p| self.chain_depth(p, memo))
                    .max()
                    .unwrap_or(0)
            }
            _ => 1,
        };
        memo.insert(*hash, depth);
        depth
    }
}

impl BlockStore for Dag {
    fn get(&self, hash: &Hash) -> Option<&SignedBlock> {
        self.blocks.get(hash)
    }

    fn by_timeslot(&self, timestamp_value: u64) -> Vec<Hash> {
        self.by_timestamp
            .get(&(timestamp_value as u32))
            .cloned()
            .unwrap_or_default()
    }

    fn tops(&self) -> Vec<Hash> {
        self.tops.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeon_types::{Block, Signature};

    fn signed(prev: Vec<Hash>, timestamp: u32) -> SignedBlock {
        SignedBlock {
            block: Block {
                prev_hashes: prev,
                timestamp,
                systemic_txs: Vec::new(),
                payment_txs: Vec::new(),
            },
            signature: Signature::from_slice(&[1u8; Signature::LEN]).unwrap(),
        }
    }

    #[test]
    fn genesis_insert_becomes_sole_top() {
        let mut dag = Dag::new();
        let hash = dag.insert(signed(vec![], 0)).unwrap();
        assert_eq!(dag.tops(), vec![hash]);
    }

    #[test]
    fn child_replaces_parent_in_tops() {
        let mut dag = Dag::new();
        let genesis = dag.insert(signed(vec![], 0)).unwrap();
        let child = dag.insert(signed(vec![genesis], 5)).unwrap();
        assert_eq!(dag.tops(), vec![child]);
    }

    #[test]
    fn two_children_of_the_same_parent_are_both_tops() {
        let mut dag = Dag::new();
        let genesis = dag.insert(signed(vec![], 0)).unwrap();
        let a = dag.insert(signed(vec![genesis], 5)).unwrap();
        let b = dag.insert(signed(vec![genesis], 5)).unwrap();
        let mut tops = dag.tops();
        tops.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(tops, expected);
    }

    #[test]
    fn missing_parent_is_rejected() {
        let mut dag = Dag::new();
        let result = dag.insert(signed(vec![[9u8; 32]], 5));
        assert!(matches!(result, Err(DagError::MissingAncestor)));
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut dag = Dag::new();
        let block = signed(vec![], 0);
        dag.insert(block.clone()).unwrap();
        assert!(matches!(dag.insert(block), Err(DagError::AlreadyPresent(_))));
    }

    #[test]
    fn ancestors_includes_the_whole_chain() {
        let mut dag = Dag::new();
        let genesis = dag.insert(signed(vec![], 0)).unwrap();
        let mid = dag.insert(signed(vec![genesis], 5)).unwrap();
        let tip = dag.insert(signed(vec![mid], 10)).unwrap();
        let mut chain = dag.ancestors(&tip);
        chain.sort();
        let mut expected = vec![genesis, mid, tip];
        expected.sort();
        assert_eq!(chain, expected);
    }

    #[test]
    fn branches_since_divergence_excludes_common_ancestor() {
        let mut dag = Dag::new();
        let genesis = dag.insert(signed(vec![], 0)).unwrap();
        let a = dag.insert(signed(vec![genesis], 5)).unwrap();
        let b = dag.insert(signed(vec![genesis], 5)).unwrap();
        let (left_only, right_only) = dag.branches_since_divergence(&a, &b);
        assert_eq!(left_only, vec![a]);
        assert_eq!(right_only, vec![b]);
    }

    #[test]
    fn by_timeslot_buckets_on_timestamp() {
        let mut dag = Dag::new();
        let genesis = dag.insert(signed(vec![], 0)).unwrap();
        assert_eq!(dag.by_timeslot(0), vec![genesis]);
        assert!(dag.by_timeslot(5).is_empty());
    }

    #[test]
    fn longest_chain_top_prefers_deeper_fork() {
        let mut dag = Dag::new();
        let genesis = dag.insert(signed(vec![], 0)).unwrap();
        let short = dag.insert(signed(vec![genesis], 5)).unwrap();
        let mid = dag.insert(signed(vec![genesis], 5)).unwrap();
        let long = dag.insert(signed(vec![mid], 10)).unwrap();
        assert_eq!(dag.longest_chain_top(&[short, long]), Some(long));
    }

    #[test]
    fn longest_chain_top_breaks_ties_toward_the_smaller_hash() {
        let mut dag = Dag::new();
        let genesis = dag.insert(signed(vec![], 0)).unwrap();
        let a = dag.insert(signed(vec![genesis], 5)).unwrap();
        let b = dag.insert(signed(vec![genesis], 5)).unwrap();
        let expected = a.min(b);
        assert_eq!(dag.longest_chain_top(&[a, b]), Some(expected));
    }

    #[test]
    fn branches_intersecting_returns_unreferenced_heads_in_window() {
        let mut dag = Dag::new();
        let genesis = dag.insert(signed(vec![], 0)).unwrap();
        let a = dag.insert(signed(vec![genesis], 5)).unwrap();
        let b = dag.insert(signed(vec![genesis], 5)).unwrap();
        let mut heads = dag.branches_intersecting(5, 10);
        heads.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(heads, expected);
    }
}
