//! The per-second step loop (spec §4.7, §5): ties `aeon-dag`, `aeon-mempool`,
//! `aeon-watcher`, `aeon-epoch`, and `aeon-permissions` together into one
//! node that ticks once per timeslot and that accepts blocks and systemic
//! transactions arriving from peers.
//!
//! Concurrency model: a single `Node` is driven by one caller, one tick at a
//! time — there is no internal locking or spawning here, matching spec §5's
//! "single-threaded cooperative step loop" (every mutation is already
//! serialized by construction; a multi-node deployment runs one `Node` per
//! process and relays `Outbox` contents between them over whatever
//! transport the caller provides).

pub mod error;
pub mod orphan;
mod rounds;
mod signing;
mod state;

use std::collections::HashMap;

use aeon_api::{BlockStore, ConsensusParams, StakeView};
use aeon_codec::hash_block;
use aeon_crypto::Keypair;
use aeon_dag::Dag;
use aeon_epoch::{epoch_number_of, in_epoch_block_number, is_new_epoch_upcoming, round_of, timeslot_of, EpochTracker};
use aeon_mempool::Mempool;
use aeon_permissions::Permissions;
use aeon_types::{
    Block, Hash, NegativeGossipTransaction, PenaltyTransaction, PublicKey, Round, Signature,
    SignedBlock, SystemicTransaction, Validator,
};
use aeon_verify::{BlockAcceptor, EraDuplicateTracker, MempoolAcceptor, VerifyError};
use aeon_watcher::ConflictWatcher;

pub use error::NodeError;
pub use orphan::{OrphanBuffer, OrphanEntry};

/// A [`StakeView`] over a validator set that never changes, for deployments
/// that supply the registry as a static input rather than deriving it from
/// on-chain stake mutations (spec §1: stake holds/releases are recognized
/// and routed, never interpreted, so a real `StakeView` that aggregates them
/// is out of this crate's scope).
#[derive(Debug, Clone)]
pub struct StaticValidatorSet(pub Vec<Validator>);

impl StakeView for StaticValidatorSet {
    fn active_validators(&self, _epoch_hash: &Hash) -> Vec<Validator> {
        self.0.clone()
    }
}

/// Transactions and blocks this tick produced, for the caller to broadcast.
#[derive(Debug, Default)]
pub struct Outbox {
    pub systemic: Vec<SystemicTransaction>,
    pub blocks: Vec<SignedBlock>,
}

impl Outbox {
    fn push_systemic(&mut self, tx: SystemicTransaction) {
        self.systemic.push(tx);
    }
}

/// What happened to one incoming block (spec §4.7.3).
#[derive(Debug)]
pub enum ReceiveOutcome {
    /// Inserted into the DAG. `follow_up` is evidence (currently only a
    /// freshly observed equivocation's [`PenaltyTransaction`]) this node
    /// produced as a side effect and has already queued in its own mempool
    /// — the caller should broadcast it too.
    Accepted {
        hash: Hash,
        follow_up: Vec<SystemicTransaction>,
    },
    /// Already in the DAG; a harmless duplicate delivery.
    AlreadyKnown(Hash),
    /// Parked in the orphan buffer. `request_parent` names a specific
    /// missing ancestor worth fetching, if the cause was a known-missing
    /// parent rather than an unresolved epoch.
    Buffered {
        hash: Hash,
        request_parent: Option<Hash>,
    },
    /// Failed structural or signature acceptance.
    Rejected { hash: Hash, reason: String },
}

fn placeholder_signature() -> Signature {
    Signature::from_slice(&[0u8; Signature::LEN]).unwrap()
}

/// One running node: its view of the DAG, its pending transactions, its
/// own per-era key material, and the local identity it signs blocks with.
///
/// Generic over `S: StakeView` (how the active validator set is supplied)
/// and `P` (the caller's notion of "who sent me this block", threaded
/// through orphan buffering so a parent-fetch request can be routed back to
/// the right peer; `()` is a fine choice for a caller with only one peer or
/// that doesn't care).
pub struct Node<S: StakeView, P = ()> {
    params: ConsensusParams,
    dag: Dag,
    mempool: Mempool,
    watcher: ConflictWatcher,
    epochs: EpochTracker,
    era_state: state::EraKeyState,
    dup_tracker: EraDuplicateTracker,
    orphans: OrphanBuffer<P>,
    permissions_cache: HashMap<Hash, Permissions>,
    stake_view: S,
    local_keypair: Keypair,
    local_pubkey: PublicKey,
    last_seen_timeslot: Option<u64>,
    signed_timeslot: Option<u64>,
}

impl<S: StakeView, P> Node<S, P> {
    /// Bootstraps a fresh node around a brand-new genesis block (spec §4.1:
    /// genesis is the sole FINAL-round block of era 0). Two nodes in the
    /// same network must be constructed with the same `params` and the same
    /// genesis, which this constructor guarantees by deriving genesis
    /// deterministically from `params.genesis_timestamp` alone.
    pub fn new(params: ConsensusParams, stake_view: S, local_keypair: Keypair) -> Result<Self, NodeError> {
        let mut dag = Dag::new();
        let genesis = SignedBlock {
            block: Block::genesis(params.genesis_timestamp),
            signature: placeholder_signature(),
        };
        dag.insert(genesis)?;

        let local_pubkey = local_keypair.public_key();
        Ok(Node {
            params,
            dag,
            mempool: Mempool::new(),
            watcher: ConflictWatcher::new(),
            epochs: EpochTracker::new(),
            era_state: state::EraKeyState::new(),
            dup_tracker: EraDuplicateTracker::new(),
            orphans: OrphanBuffer::default(),
            permissions_cache: HashMap::new(),
            stake_view,
            local_keypair,
            local_pubkey,
            last_seen_timeslot: None,
            signed_timeslot: None,
        })
    }

    pub fn local_pubkey(&self) -> PublicKey {
        self.local_pubkey
    }

    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    fn timestamp_for_timeslot(&self, timeslot: u64) -> u32 {
        self.params.genesis_timestamp + (timeslot * self.params.block_time_secs as u64) as u32
    }

    fn permissions_for(&mut self, epoch_hash: &Hash) -> Result<Permissions, NodeError> {
        if let Some(permissions) = self.permissions_cache.get(epoch_hash) {
            return Ok(permissions.clone());
        }
        let seed = self.epochs.seed_for(epoch_hash).ok_or(NodeError::UnseededEra)?;
        let validators = self.stake_view.active_validators(epoch_hash);
        let permissions = Permissions::compute(seed, &validators, self.params.round_duration)?;
        self.permissions_cache.insert(*epoch_hash, permissions.clone());
        Ok(permissions)
    }

    /// Advances the node by one timeslot, running every step of spec §4.7:
    /// epoch-boundary bookkeeping, round-specific emission, missed-slot
    /// negative gossip, and — if this node is elected — block assembly.
    pub fn step(&mut self, now: u32) -> Result<Outbox, NodeError> {
        let mut out = Outbox::default();
        let now_timeslot = timeslot_of(now, &self.params);
        self.orphans.gc(now_timeslot);

        if now_timeslot == 0 {
            // Genesis's own timeslot; nothing precedes it to run a round for.
            self.last_seen_timeslot = Some(now_timeslot);
            return Ok(out);
        }

        if is_new_epoch_upcoming(now_timeslot, &self.params) {
            let main_top = self.dag.longest_chain_top(&self.dag.tops());
            let active_count = main_top
                .map(|top| self.stake_view.active_validators(&top).len())
                .unwrap_or(1)
                .max(1);
            self.epochs.accept_tops_as_epoch_hashes(&self.dag, active_count, &self.params);
            self.dup_tracker.advance_era(epoch_number_of(now_timeslot, &self.params));
            self.flush_pending_epoch_orphans(&mut out);
        }

        let main_top = self
            .dag
            .longest_chain_top(&self.dag.tops())
            .ok_or(NodeError::UnresolvedEpoch)?;
        let epoch_hash = self
            .epochs
            .epoch_hash_for_new_block(&self.dag, &main_top, now_timeslot, &self.params)
            .ok_or(NodeError::UnresolvedEpoch)?;
        let permissions = self.permissions_for(&epoch_hash)?;
        let round = round_of(now_timeslot, &self.params);
        let epoch_number = epoch_number_of(now_timeslot, &self.params);
        self.era_state.roll_to_era(epoch_number);

        self.run_round_emission(round, &permissions, &epoch_hash, &mut out)?;

        if Some(now_timeslot) != self.last_seen_timeslot {
            self.last_seen_timeslot = Some(now_timeslot);
            if self.maybe_emit_negative_gossip(now_timeslot, main_top, &mut out)? {
                return Ok(out);
            }
        }

        let in_epoch_block_number = in_epoch_block_number(now_timeslot, &self.params);
        let elected = permissions.sign_permission(in_epoch_block_number) == self.local_pubkey;
        if elected && self.signed_timeslot != Some(now_timeslot) {
            let block = signing::assemble_and_sign_block(
                &self.dag,
                &mut self.mempool,
                &self.watcher,
                &mut self.era_state,
                &self.local_keypair,
                self.local_pubkey,
                round,
                now,
            )?;
            self.signed_timeslot = Some(now_timeslot);
            let local_pubkey = self.local_pubkey;
            let (_, follow_up) = self.ingest_accepted_block(block.clone(), local_pubkey)?;
            out.blocks.push(block);
            out.systemic.extend(follow_up);
        }

        Ok(out)
    }

    /// Runs this tick's round-specific emission (spec §4.7.1). Every active
    /// validator participates regardless of election; emitted transactions
    /// go both into this node's own mempool (so they're available for its
    /// own block assembly this same tick, should it be elected) and into
    /// `out` for the caller to broadcast.
    fn run_round_emission(
        &mut self,
        round: Round,
        permissions: &Permissions,
        epoch_hash: &Hash,
        out: &mut Outbox,
    ) -> Result<(), NodeError> {
        let Some(local_index) = permissions.index_of(&self.local_pubkey) else {
            return Ok(());
        };

        match round {
            Round::Public => {
                if let Some(SystemicTransaction::PublicKey(tx)) = rounds::emit_public(&mut self.era_state, local_index) {
                    let signed = rounds::sign_public_key_transaction(&self.local_keypair, tx)?;
                    let systemic = SystemicTransaction::PublicKey(signed);
                    self.mempool.insert_systemic(systemic.clone());
                    out.push_systemic(systemic);
                }
            }
            Round::SecretShare => {
                if let Some(SystemicTransaction::SplitRandom(tx)) =
                    rounds::emit_secretshare(&mut self.era_state, permissions, local_index)
                {
                    let signed = rounds::sign_split_random_transaction(&self.local_keypair, tx)?;
                    let systemic = SystemicTransaction::SplitRandom(signed);
                    self.mempool.insert_systemic(systemic.clone());
                    out.push_systemic(systemic);
                }
            }
            Round::Commit => {
                if let Some(tx) = rounds::emit_commit(&mut self.era_state, local_index) {
                    let signed = rounds::sign_commit_random_transaction(
                        &self.local_keypair,
                        epoch_hash,
                        tx,
                        &mut self.era_state,
                    )?;
                    let systemic = SystemicTransaction::CommitRandom(signed);
                    self.mempool.insert_systemic(systemic.clone());
                    out.push_systemic(systemic);
                }
            }
            Round::Reveal => {
                if let Some(tx) = rounds::emit_reveal(&mut self.era_state) {
                    self.mempool.insert_systemic(tx.clone());
                    out.push_systemic(tx);
                }
            }
            Round::Private => {
                // Attached directly at block-assembly time; see
                // `signing::assemble_and_sign_block`.
            }
            Round::Final => {
                if self.era_state.take_final_latch() {
                    self.mempool.remove_all_systemic();
                }
            }
        }

        Ok(())
    }

    /// Checks whether the timeslot just finished produced a block; if not
    /// and this node is permitted to answer for it, emits and queues one
    /// `NegativeGossipTransaction` (spec §4.7.2, testable property 4).
    /// Returns `true` if this tick should stop short of signing (spec §5:
    /// a node that just gossiped a missed slot does not also try to sign
    /// this slot in the same tick — the two are reported separately even
    /// though nothing here actually conflicts; this mirrors the reference
    /// ordering in spec §4.7).
    fn maybe_emit_negative_gossip(
        &mut self,
        now_timeslot: u64,
        main_top: Hash,
        out: &mut Outbox,
    ) -> Result<bool, NodeError> {
        let prev_timeslot = now_timeslot - 1;
        let prev_timestamp = self.timestamp_for_timeslot(prev_timeslot);
        if !self.dag.by_timeslot(prev_timestamp as u64).is_empty() {
            return Ok(false);
        }

        let Some(prev_epoch_hash) =
            self.epochs
                .epoch_hash_for_new_block(&self.dag, &main_top, prev_timeslot, &self.params)
        else {
            return Ok(false);
        };
        let Ok(permissions) = self.permissions_for(&prev_epoch_hash) else {
            return Ok(false);
        };

        let prev_in_epoch_block_number = in_epoch_block_number(prev_timeslot, &self.params);
        if !permissions.is_gossip_permitted(prev_in_epoch_block_number, &self.local_pubkey) {
            return Ok(false);
        }
        if !self.era_state.take_negative_gossip_latch(prev_timeslot) {
            return Ok(false);
        }

        let mut tx = NegativeGossipTransaction {
            pubkey: self.local_pubkey,
            timestamp: prev_timestamp,
            block_number: prev_timeslot as u32,
            signature: placeholder_signature(),
        };
        let digest = aeon_codec::negative_gossip_signing_hash(&tx);
        tx.signature = self.local_keypair.sign(&digest)?;
        let systemic = SystemicTransaction::NegativeGossip(tx);
        self.mempool.insert_systemic(systemic.clone());
        out.push_systemic(systemic);
        Ok(true)
    }

    /// Inserts a just-produced-or-received block into the DAG and threads
    /// through every side effect one acceptance implies: conflict-watcher
    /// bookkeeping, era-key-state scanning, mempool cleanup, and — if the
    /// insertion newly exposes an equivocation — a signed
    /// [`PenaltyTransaction`] queued for inclusion in a future PRIVATE
    /// round (spec §4.4, §8 scenario S3: any honest node that observes the
    /// conflict produces the evidence, not only the next elected signer).
    fn ingest_accepted_block(
        &mut self,
        signed: SignedBlock,
        signer: PublicKey,
    ) -> Result<(Hash, Vec<SystemicTransaction>), NodeError> {
        let timeslot = timeslot_of(signed.block.timestamp, &self.params);
        let epoch_number = epoch_number_of(timeslot, &self.params);

        if self.era_state.era() == epoch_number {
            self.era_state.record_block_systemics(&signed.block);
        }
        self.mempool.remove_included_systemic(&signed.block.systemic_txs);
        self.mempool.remove_included_payments(&signed.block.payment_txs);

        let hash = self.dag.insert(signed)?;
        self.watcher.on_new_block(hash, epoch_number, signer);

        let mut follow_up = Vec::new();
        let conflicts = self.watcher.conflicts_of(&hash);
        if !conflicts.is_empty() {
            let mut cited = conflicts;
            cited.push(hash);
            cited.sort();
            cited.dedup();
            let mut penalty = PenaltyTransaction {
                conflicts: cited,
                signature: placeholder_signature(),
            };
            penalty.signature = self.local_keypair.sign(&penalty.signing_hash())?;
            let tx = SystemicTransaction::Penalty(penalty);
            self.mempool.insert_systemic(tx.clone());
            follow_up.push(tx);
        }

        Ok((hash, follow_up))
    }

    /// Accepts a systemic transaction arriving from a peer (as opposed to
    /// one produced locally by `run_round_emission`) into the mempool,
    /// running the full `MempoolAcceptor` checks for kinds that carry an
    /// identifiable signer at this layer (spec §4.6(a)). `now` resolves the
    /// epoch context the same way `step` would for a block at this instant.
    pub fn receive_systemic(&mut self, tx: SystemicTransaction, now: u32) -> Result<(), NodeError> {
        let needs_epoch_context = !matches!(
            tx,
            SystemicTransaction::RevealRandom(_)
                | SystemicTransaction::PrivateKey(_)
                | SystemicTransaction::Penalty(_)
                | SystemicTransaction::PenaltyGossip(_)
        );
        if !needs_epoch_context {
            self.mempool.insert_systemic(tx);
            return Ok(());
        }

        let now_timeslot = timeslot_of(now, &self.params);
        let main_top = self
            .dag
            .longest_chain_top(&self.dag.tops())
            .ok_or(NodeError::UnresolvedEpoch)?;
        let epoch_hash = self
            .epochs
            .epoch_hash_for_new_block(&self.dag, &main_top, now_timeslot, &self.params)
            .ok_or(NodeError::UnresolvedEpoch)?;
        let permissions = self.permissions_for(&epoch_hash)?;

        MempoolAcceptor::accept(&tx, &epoch_hash, &permissions, &mut self.dup_tracker)?;
        self.mempool.insert_systemic(tx);
        Ok(())
    }

    /// Accepts a block arriving from a peer (spec §4.7.3): buffers it as an
    /// orphan if its parents or governing epoch aren't known yet, otherwise
    /// runs full structural acceptance and, on success, flushes any
    /// previously buffered children this acceptance unblocks.
    pub fn receive_block(&mut self, signed: SignedBlock, from: P) -> Vec<ReceiveOutcome> {
        self.process_incoming(signed, from)
    }

    fn process_incoming(&mut self, signed: SignedBlock, from: P) -> Vec<ReceiveOutcome> {
        let mut results = Vec::new();
        let mut queue = vec![(signed, from)];
        while let Some((signed, from)) = queue.pop() {
            let outcome = self.attempt_accept(signed, from);
            if let ReceiveOutcome::Accepted { hash, .. } = &outcome {
                let ready = self.orphans.take_waiting_on(hash);
                for (_, entry) in ready {
                    queue.push((entry.block, entry.from));
                }
            }
            results.push(outcome);
        }
        results
    }

    fn attempt_accept(&mut self, signed: SignedBlock, from: P) -> ReceiveOutcome {
        let hash = hash_block(&signed.block);
        if self.dag.contains(&hash) {
            return ReceiveOutcome::AlreadyKnown(hash);
        }

        let timeslot = timeslot_of(signed.block.timestamp, &self.params);
        let all_parents_known = signed.block.prev_hashes.iter().all(|p| self.dag.contains(p));
        if !all_parents_known {
            let missing = signed.block.prev_hashes.iter().find(|p| !self.dag.contains(p)).copied();
            self.orphans.insert(
                hash,
                OrphanEntry {
                    block: signed,
                    from,
                    received_at_timeslot: timeslot,
                },
            );
            return ReceiveOutcome::Buffered { hash, request_parent: missing };
        }

        let Some(parent) = signed.block.prev_hashes.first().copied() else {
            return ReceiveOutcome::Rejected {
                hash,
                reason: VerifyError::MissingAncestor.to_string(),
            };
        };

        let Some(epoch_hash) =
            self.epochs
                .epoch_hash_for_new_block(&self.dag, &parent, timeslot, &self.params)
        else {
            self.orphans.insert(
                hash,
                OrphanEntry {
                    block: signed,
                    from,
                    received_at_timeslot: timeslot,
                },
            );
            return ReceiveOutcome::Buffered { hash, request_parent: None };
        };

        let permissions = match self.permissions_for(&epoch_hash) {
            Ok(permissions) => permissions,
            Err(_) => {
                self.orphans.insert(
                    hash,
                    OrphanEntry {
                        block: signed,
                        from,
                        received_at_timeslot: timeslot,
                    },
                );
                return ReceiveOutcome::Buffered { hash, request_parent: None };
            }
        };

        let in_epoch_block_number = in_epoch_block_number(timeslot, &self.params);
        let known = |h: &Hash| self.dag.contains(h);
        let accepted = BlockAcceptor::accept(
            &signed,
            &hash,
            timeslot,
            in_epoch_block_number,
            &self.params,
            &permissions,
            known,
        );

        match accepted {
            Ok(signer) => match self.ingest_accepted_block(signed, signer) {
                Ok((hash, follow_up)) => ReceiveOutcome::Accepted { hash, follow_up },
                Err(err) => ReceiveOutcome::Rejected {
                    hash,
                    reason: err.to_string(),
                },
            },
            Err(err) => ReceiveOutcome::Rejected {
                hash,
                reason: err.to_string(),
            },
        }
    }

    /// Retries every buffered block whose parents are all known but whose
    /// epoch couldn't previously be resolved — worth another attempt right
    /// after a new era has just been seeded.
    fn flush_pending_epoch_orphans(&mut self, out: &mut Outbox) {
        let dag = &self.dag;
        let ready = self.orphans.take_pending_epoch(|h| dag.contains(h));
        for (_, entry) in ready {
            for outcome in self.process_incoming(entry.block, entry.from) {
                if let ReceiveOutcome::Accepted { follow_up, .. } = outcome {
                    out.systemic.extend(follow_up);
                }
            }
        }
    }
}
