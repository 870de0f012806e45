//! Per-era key material and idempotency latches (spec §4.7.1).
//!
//! A node must emit at most one of each round's systemic transaction per
//! era no matter how many times its step loop ticks through that round,
//! and must remember the private halves of its own PUBLIC/COMMIT
//! ephemeral keypairs until PRIVATE/REVEAL disclose them. All of that
//! lives here, reset wholesale whenever the era number advances.

use std::collections::{HashMap, HashSet};

use aeon_crypto::Keypair;
use aeon_types::{Block, Hash, PublicKey, RevealRandomTransaction, SystemicTransaction};

/// Tracks, for the era currently in progress, which round emissions this
/// node has already published and the private key material those
/// emissions need to stay consistent with later rounds.
#[derive(Default)]
pub(crate) struct EraKeyState {
    era: u64,
    /// This node's own PUBLIC-round ephemeral keypair, kept until PRIVATE
    /// discloses its private half.
    pub(crate) ephemeral_keypair: Option<Keypair>,
    /// This node's own COMMIT-round keypair; only the private half
    /// matters after COMMIT runs, carried as the pending reveal's payload.
    pub(crate) pending_reveal: Option<RevealRandomTransaction>,
    /// Ephemeral public keys observed this era via `PublicKeyTransaction`,
    /// keyed by validator-set signer index. Used to address SECRETSHARE
    /// pieces to their recipients.
    pub(crate) ephemeral_pubkeys: HashMap<u32, PublicKey>,
    /// `CommitRandomTransaction::reference_hash` values seen in blocks this
    /// era, needed to validate reveals in-block (spec §4.6(b)).
    pub(crate) known_commit_hashes: HashSet<Hash>,
    published_public_key: bool,
    published_split_random: bool,
    published_commit: bool,
    published_reveal: bool,
    published_private_key: bool,
    cleared_final: bool,
    last_negative_gossip_timeslot: Option<u64>,
}

impl EraKeyState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wipes every per-era latch and key when `era` differs from the era
    /// this state was last used for. A no-op within the same era.
    pub(crate) fn roll_to_era(&mut self, era: u64) {
        if era != self.era {
            *self = EraKeyState {
                era,
                ..Default::default()
            };
        }
    }

    pub(crate) fn era(&self) -> u64 {
        self.era
    }

    pub(crate) fn record_ephemeral_pubkey(&mut self, signer_index: u32, pubkey: PublicKey) {
        self.ephemeral_pubkeys.insert(signer_index, pubkey);
    }

    /// Scans one just-accepted block's systemic transactions for material
    /// later rounds in this era depend on: published ephemeral public keys
    /// (for addressing SECRETSHARE pieces) and commit reference hashes
    /// (for validating REVEAL in-block). Called for every block accepted
    /// into the DAG, own or received, regardless of which node produced it.
    pub(crate) fn record_block_systemics(&mut self, block: &Block) {
        for tx in &block.systemic_txs {
            match tx {
                SystemicTransaction::PublicKey(t) => {
                    self.record_ephemeral_pubkey(t.signer_index, t.generated_pubkey);
                }
                SystemicTransaction::CommitRandom(t) => {
                    self.known_commit_hashes.insert(t.reference_hash());
                }
                _ => {}
            }
        }
    }

    pub(crate) fn take_public_key_latch(&mut self) -> bool {
        let already = self.published_public_key;
        self.published_public_key = true;
        !already
    }

    pub(crate) fn take_split_random_latch(&mut self) -> bool {
        let already = self.published_split_random;
        self.published_split_random = true;
        !already
    }

    pub(crate) fn take_commit_latch(&mut self) -> bool {
        let already = self.published_commit;
        self.published_commit = true;
        !already
    }

    pub(crate) fn take_reveal_latch(&mut self) -> bool {
        let already = self.published_reveal;
        self.published_reveal = true;
        !already
    }

    pub(crate) fn take_private_key_latch(&mut self) -> bool {
        let already = self.published_private_key;
        self.published_private_key = true;
        !already
    }

    pub(crate) fn take_final_latch(&mut self) -> bool {
        let already = self.cleared_final;
        self.cleared_final = true;
        !already
    }

    /// `true` if no negative gossip has been emitted for `timeslot` yet
    /// this call; records `timeslot` as gossiped-about either way so a
    /// second call for the same timeslot reports `false` (spec §5: at
    /// most one negative gossip per timeslot per authorized node).
    pub(crate) fn take_negative_gossip_latch(&mut self, timeslot: u64) -> bool {
        if self.last_negative_gossip_timeslot == Some(timeslot) {
            return false;
        }
        self.last_negative_gossip_timeslot = Some(timeslot);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latches_fire_once_per_era() {
        let mut state = EraKeyState::new();
        state.roll_to_era(1);
        assert!(state.take_public_key_latch());
        assert!(!state.take_public_key_latch());
    }

    #[test]
    fn rolling_to_a_new_era_resets_latches_and_keys() {
        let mut state = EraKeyState::new();
        state.roll_to_era(1);
        state.take_public_key_latch();
        state.record_ephemeral_pubkey(0, PublicKey::from_slice(&[1u8; PublicKey::LEN]).unwrap());

        state.roll_to_era(2);
        assert!(state.take_public_key_latch());
        assert!(state.ephemeral_pubkeys.is_empty());
    }

    #[test]
    fn rolling_to_the_same_era_is_a_no_op() {
        let mut state = EraKeyState::new();
        state.roll_to_era(1);
        state.take_public_key_latch();
        state.roll_to_era(1);
        assert!(!state.take_public_key_latch());
    }

    #[test]
    fn record_block_systemics_indexes_ephemeral_keys_and_commit_hashes() {
        use aeon_types::{CommitRandomTransaction, PublicKeyTransaction, Signature, SystemicTransaction};

        let mut state = EraKeyState::new();
        state.roll_to_era(1);
        let pubkey = PublicKey::from_slice(&[9u8; PublicKey::LEN]).unwrap();
        let sig = Signature::from_slice(&[0u8; Signature::LEN]).unwrap();
        let commit = CommitRandomTransaction {
            encrypted_random: vec![1, 2, 3],
            signer_index: 2,
            signature: sig,
        };
        let reference = commit.reference_hash();

        let block = Block {
            prev_hashes: vec![],
            timestamp: 0,
            systemic_txs: vec![
                SystemicTransaction::PublicKey(PublicKeyTransaction {
                    generated_pubkey: pubkey,
                    signer_index: 3,
                    signature: sig,
                }),
                SystemicTransaction::CommitRandom(commit),
            ],
            payment_txs: vec![],
        };
        state.record_block_systemics(&block);

        assert_eq!(state.ephemeral_pubkeys.get(&3), Some(&pubkey));
        assert!(state.known_commit_hashes.contains(&reference));
    }

    #[test]
    fn negative_gossip_latch_is_per_timeslot() {
        let mut state = EraKeyState::new();
        state.roll_to_era(1);
        assert!(state.take_negative_gossip_latch(10));
        assert!(!state.take_negative_gossip_latch(10));
        assert!(state.take_negative_gossip_latch(11));
    }
}
