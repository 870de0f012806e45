//! Gossip validation and block assembly (spec §4.7.2), run once per
//! timeslot by whichever node `sign_permission` elects for it.

use std::collections::{HashMap, HashSet};

use aeon_crypto::{sha256, Keypair};
use aeon_dag::Dag;
use aeon_mempool::Mempool;
use aeon_types::{
    Block, Hash, NegativeGossipTransaction, PaymentTransaction, PenaltyGossipTransaction,
    PositiveGossipTransaction, PublicKey, Round, SignedBlock, SystemicTransaction, TxOut,
};
use aeon_verify::InBlockAcceptor;
use aeon_watcher::ConflictWatcher;

use crate::error::NodeError;
use crate::rounds;
use crate::state::EraKeyState;

/// Nominal unit amount of the coinbase-style `PaymentTransaction` every
/// signed block carries (spec §2 supplement: "pays sha256(signer_pubkey)").
/// Real token issuance and UTXO bookkeeping are out of scope (spec §1); the
/// amount exists so the reward transaction has a well-formed, non-zero
/// output.
pub const BLOCK_REWARD: u64 = 1;

fn placeholder_signature() -> aeon_types::Signature {
    aeon_types::Signature::from_slice(&[0u8; aeon_types::Signature::LEN]).unwrap()
}

/// Cross-references this tick's negative gossip against positive gossip
/// from the same `(pubkey, timestamp)`: claiming both "I saw nothing" and
/// "here is the hash I have" for the same slot is a contradiction. Returns
/// every gossip transaction unchanged (contradicting evidence still gets
/// included) plus one `PenaltyGossipTransaction` per contradicting pair.
pub(crate) fn validate_gossip(
    gossips: Vec<SystemicTransaction>,
) -> (Vec<SystemicTransaction>, Vec<PenaltyGossipTransaction>) {
    let mut negatives: HashMap<(PublicKey, u32), &NegativeGossipTransaction> = HashMap::new();
    let mut positives: HashMap<(PublicKey, u32), &PositiveGossipTransaction> = HashMap::new();

    for g in &gossips {
        match g {
            SystemicTransaction::NegativeGossip(t) => {
                negatives.insert((t.pubkey, t.timestamp), t);
            }
            SystemicTransaction::PositiveGossip(t) => {
                positives.insert((t.pubkey, t.timestamp), t);
            }
            _ => {}
        }
    }

    let mut penalties = Vec::new();
    for (key, neg) in &negatives {
        if let Some(pos) = positives.get(key) {
            penalties.push(PenaltyGossipTransaction {
                positive: aeon_codec::positive_gossip_signing_hash(pos),
                negative: aeon_codec::negative_gossip_signing_hash(neg),
                signature: placeholder_signature(),
            });
        }
    }

    (gossips, penalties)
}

/// Builds, signs, and returns the block this node is electing to produce
/// this timeslot. Does not insert it into the DAG or touch the conflict
/// watcher — the caller runs that through the same path used for received
/// blocks (`Node::ingest_accepted_block`), so authorship and mempool
/// cleanup only happen in one place.
#[allow(clippy::too_many_arguments)]
pub(crate) fn assemble_and_sign_block(
    dag: &Dag,
    mempool: &mut Mempool,
    watcher: &ConflictWatcher,
    era_state: &mut EraKeyState,
    local_keypair: &Keypair,
    local_pubkey: PublicKey,
    round: Round,
    now: u32,
) -> Result<SignedBlock, NodeError> {
    let known_commit_hashes = era_state.known_commit_hashes.clone();
    let known_conflict_hashes: HashSet<Hash> = dag
        .tops()
        .iter()
        .flat_map(|t| dag.ancestors(t))
        .filter(|h| watcher.is_known(h))
        .collect();

    let mut round_txs: Vec<SystemicTransaction> = mempool
        .pop_round_systemic(round)
        .into_iter()
        .filter(|tx| InBlockAcceptor::accept(tx, round, &known_commit_hashes, &known_conflict_hashes).is_ok())
        .collect();

    if round == Round::Private {
        if let Some(tx) = rounds::emit_private_key(era_state) {
            round_txs.push(tx);
        }
    }

    let gossips = mempool.pop_current_gossips();
    let (mut gossips, penalties) = validate_gossip(gossips);
    for mut penalty in penalties {
        penalty.signature = local_keypair.sign(&penalty.signing_hash())?;
        gossips.push(SystemicTransaction::PenaltyGossip(penalty));
    }
    round_txs.append(&mut gossips);

    let tops = dag.tops();
    let chosen_top = dag.longest_chain_top(&tops);
    let prev_hashes = match chosen_top {
        Some(top) => {
            let mut parents = vec![top];
            parents.extend(tops.iter().copied().filter(|h| *h != top));
            parents
        }
        None => Vec::new(),
    };

    let reward = PaymentTransaction {
        inputs: vec![],
        outputs: vec![TxOut {
            amount: BLOCK_REWARD,
            recipient: sha256(local_pubkey.as_bytes()),
        }],
        signature: placeholder_signature(),
    };
    let mut payment_txs = vec![reward];
    payment_txs.extend(mempool.pop_payments(usize::MAX));

    let block = Block {
        prev_hashes,
        timestamp: now,
        systemic_txs: round_txs,
        payment_txs,
    };
    let hash = aeon_codec::hash_block(&block);
    let signature = local_keypair.sign(&hash)?;
    Ok(SignedBlock { block, signature })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeon_types::{NegativeGossipTransaction, Signature};

    fn sig() -> Signature {
        Signature::from_slice(&[0u8; Signature::LEN]).unwrap()
    }

    fn pubkey(byte: u8) -> PublicKey {
        PublicKey::from_slice(&[byte; PublicKey::LEN]).unwrap()
    }

    #[test]
    fn contradicting_gossip_from_same_author_yields_one_penalty() {
        let block = Box::new(SignedBlock {
            block: Block::genesis(0),
            signature: sig(),
        });
        let gossips = vec![
            SystemicTransaction::NegativeGossip(NegativeGossipTransaction {
                pubkey: pubkey(1),
                timestamp: 10,
                block_number: 2,
                signature: sig(),
            }),
            SystemicTransaction::PositiveGossip(PositiveGossipTransaction {
                pubkey: pubkey(1),
                timestamp: 10,
                block_hash: [9u8; 32],
                signed_block: block,
                signature: sig(),
            }),
        ];
        let (kept, penalties) = validate_gossip(gossips);
        assert_eq!(kept.len(), 2);
        assert_eq!(penalties.len(), 1);
    }

    #[test]
    fn non_contradicting_gossip_yields_no_penalty() {
        let gossips = vec![SystemicTransaction::NegativeGossip(NegativeGossipTransaction {
            pubkey: pubkey(1),
            timestamp: 10,
            block_number: 2,
            signature: sig(),
        })];
        let (_, penalties) = validate_gossip(gossips);
        assert!(penalties.is_empty());
    }
}
