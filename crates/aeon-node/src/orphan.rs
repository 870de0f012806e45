//! Orphan buffering for blocks whose parents (or governing epoch) aren't
//! known yet (spec §4.7.3, §9 open question 2).
//!
//! Retained until its parents arrive, its epoch becomes resolvable, or it
//! ages out. Bounded two ways so a malicious or merely chatty peer can't
//! grow this without limit: a hard cap on entry count (oldest evicted
//! first) and a max age in timeslots, swept on every tick.

use std::collections::HashMap;

use aeon_types::{Hash, SignedBlock};

/// Evicted once an entry has sat in the buffer longer than this many
/// timeslots without its parents resolving.
pub const MAX_ORPHANS: usize = 256;
/// Hard cap on buffered entries regardless of age.
pub const ORPHAN_MAX_AGE_TIMESLOTS: u64 = 64;

pub struct OrphanEntry<P> {
    pub block: SignedBlock,
    pub from: P,
    pub received_at_timeslot: u64,
}

/// Blocks parked because they can't yet be validated, keyed by their own
/// hash. Generic over `P`, the caller's notion of "who sent me this" —
/// transport is out of scope here, so the node never interprets `P`
/// beyond handing it back out in a parent-fetch request.
pub struct OrphanBuffer<P> {
    entries: HashMap<Hash, OrphanEntry<P>>,
    insertion_order: Vec<Hash>,
    max_orphans: usize,
    max_age_timeslots: u64,
}

impl<P> Default for OrphanBuffer<P> {
    fn default() -> Self {
        Self::new(MAX_ORPHANS, ORPHAN_MAX_AGE_TIMESLOTS)
    }
}

impl<P> OrphanBuffer<P> {
    pub fn new(max_orphans: usize, max_age_timeslots: u64) -> Self {
        Self {
            entries: HashMap::new(),
            insertion_order: Vec::new(),
            max_orphans,
            max_age_timeslots,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.entries.contains_key(hash)
    }

    /// Buffers `entry` under `hash`, evicting the oldest entry first if
    /// the buffer is already at capacity. A re-insertion of an
    /// already-buffered hash refreshes nothing — the first sighting's
    /// timestamp is what ages out.
    pub fn insert(&mut self, hash: Hash, entry: OrphanEntry<P>) {
        if self.entries.contains_key(&hash) {
            return;
        }
        if self.entries.len() >= self.max_orphans {
            if let Some(oldest) = self.insertion_order.first().copied() {
                self.entries.remove(&oldest);
                self.insertion_order.remove(0);
            }
        }
        self.insertion_order.push(hash);
        self.entries.insert(hash, entry);
    }

    /// Drops every entry older than `max_age_timeslots`, relative to
    /// `current_timeslot`. Returns how many were swept, for logging.
    pub fn gc(&mut self, current_timeslot: u64) -> usize {
        let max_age = self.max_age_timeslots;
        let before = self.entries.len();
        let expired: Vec<Hash> = self
            .entries
            .iter()
            .filter(|(_, e)| current_timeslot.saturating_sub(e.received_at_timeslot) > max_age)
            .map(|(h, _)| *h)
            .collect();
        for hash in &expired {
            self.entries.remove(hash);
        }
        self.insertion_order.retain(|h| self.entries.contains_key(h));
        before - self.entries.len()
    }

    /// Removes and returns every buffered entry whose block cites
    /// `parent_hash` among its own parents — the set worth re-attempting
    /// once `parent_hash` becomes known.
    pub fn take_waiting_on(&mut self, parent_hash: &Hash) -> Vec<(Hash, OrphanEntry<P>)> {
        let ready: Vec<Hash> = self
            .entries
            .iter()
            .filter(|(_, e)| e.block.block.prev_hashes.contains(parent_hash))
            .map(|(h, _)| *h)
            .collect();

        let mut out = Vec::with_capacity(ready.len());
        for hash in ready {
            if let Some(entry) = self.entries.remove(&hash) {
                self.insertion_order.retain(|h| *h != hash);
                out.push((hash, entry));
            }
        }
        out
    }

    /// Every buffered entry that is not waiting on any specific missing
    /// parent (its parents are all known, but its governing epoch could
    /// not yet be resolved) — worth retrying once a new era is seeded.
    pub fn take_pending_epoch(&mut self, known: impl Fn(&Hash) -> bool) -> Vec<(Hash, OrphanEntry<P>)> {
        let ready: Vec<Hash> = self
            .entries
            .iter()
            .filter(|(_, e)| e.block.block.prev_hashes.iter().all(|h| known(h)))
            .map(|(h, _)| *h)
            .collect();

        let mut out = Vec::with_capacity(ready.len());
        for hash in ready {
            if let Some(entry) = self.entries.remove(&hash) {
                self.insertion_order.retain(|h| *h != hash);
                out.push((hash, entry));
            }
        }
        out
    }
}
