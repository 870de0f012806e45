//! Per-era duplicate tracking shared by the mempool and in-block acceptors
//! (spec testable property 3: at most one of each rate-limited systemic
//! kind is accepted from any one signer per era).

use std::collections::HashSet;

use aeon_crypto::sha256;
use aeon_types::{Hash, SystemicTransaction};

/// Identifies one (signer, kind) pair within a single era.
///
/// `PrivateKeyTransaction` carries no signer index of its own; a signer
/// only ever generates one ephemeral keypair per era (in PUBLIC), so a
/// genuine re-submission necessarily repeats the exact same private-key
/// bytes, making the hash of the disclosed key itself a sound identity for
/// this one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Identity {
    SignerIndex(u8, u32),
    PrivateKeyHash(Hash),
}

/// Tracks which (signer, kind) pairs have already been observed this era.
/// Callers reset it by calling [`EraDuplicateTracker::advance_era`]
/// whenever the FINAL round of the previous era has passed.
#[derive(Debug, Default)]
pub struct EraDuplicateTracker {
    era: u64,
    seen: HashSet<Identity>,
}

impl EraDuplicateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears tracked signers when `era` differs from the last one seen.
    /// Idempotent across repeated calls within the same era.
    pub fn advance_era(&mut self, era: u64) {
        if era != self.era {
            self.era = era;
            self.seen.clear();
        }
    }

    /// Records `tx`'s (signer, kind) identity, returning `true` if this is
    /// the first time it has been seen this era. Kinds with no rate limit
    /// always return `true` without being recorded.
    pub fn observe(&mut self, tx: &SystemicTransaction) -> bool {
        match Self::identity_of(tx) {
            Some(identity) => self.seen.insert(identity),
            None => true,
        }
    }

    fn identity_of(tx: &SystemicTransaction) -> Option<Identity> {
        match tx {
            SystemicTransaction::PublicKey(t) => Some(Identity::SignerIndex(0, t.signer_index)),
            SystemicTransaction::SplitRandom(t) => Some(Identity::SignerIndex(1, t.signer_index)),
            SystemicTransaction::CommitRandom(t) => Some(Identity::SignerIndex(2, t.signer_index)),
            SystemicTransaction::PrivateKey(t) => {
                Some(Identity::PrivateKeyHash(sha256(t.private_key.as_bytes())))
            }
            _ => None,
        }
    }
}
