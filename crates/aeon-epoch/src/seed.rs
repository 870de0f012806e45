//! Entropy seed derivation for the distributed random beacon (spec §4.1).
//!
//! Walks every block of a finished era, recovers each committer's 32-byte
//! contribution either by decrypting a matching reveal or, for
//! committers who never revealed, by Shamir-recombining the shares they
//! distributed in SECRETSHARE using the now-disclosed ephemeral private
//! keys from PRIVATE. XORs every recovered contribution into the era's
//! seed. Falls back to a deterministic pseudo-seed when too few
//! contributions can be recovered (spec §9 open question).

use std::collections::HashMap;

use aeon_api::ConsensusParams;
use aeon_crypto::{decrypt, recombine_secret, sha256};
use aeon_types::{Hash, PrivateKey, PublicKey, SignedBlock, SystemicTransaction};

use crate::clock::{epoch_number_of, timeslot_of};

/// Everything collected by walking one era's blocks, ready to be reduced
/// into contributions.
#[derive(Default)]
struct EraMaterial {
    /// Ephemeral public key each signer published in PUBLIC, used by
    /// others to encrypt shares addressed to them.
    ephemeral_pubkeys: HashMap<u32, PublicKey>,
    /// Each dealer's SECRETSHARE split, keyed by dealer signer index.
    splits: HashMap<u32, Vec<Option<Vec<u8>>>>,
    /// Each committer's COMMIT, keyed by signer index.
    commits: HashMap<u32, aeon_types::CommitRandomTransaction>,
    /// Reveals, keyed by the commit reference hash they claim to unlock.
    reveals: HashMap<Hash, PrivateKey>,
    /// Ephemeral private keys disclosed in PRIVATE, keyed by the signer
    /// index whose PUBLIC pubkey they match.
    ephemeral_privkeys: HashMap<u32, PrivateKey>,
}

fn collect_era_material(blocks: &[&SignedBlock]) -> EraMaterial {
    let mut material = EraMaterial::default();

    for signed in blocks {
        for tx in &signed.block.systemic_txs {
            match tx {
                SystemicTransaction::PublicKey(t) => {
                    material
                        .ephemeral_pubkeys
                        .insert(t.signer_index, t.generated_pubkey);
                }
                SystemicTransaction::SplitRandom(t) => {
                    material.splits.insert(t.signer_index, t.pieces.clone());
                }
                SystemicTransaction::CommitRandom(t) => {
                    material.commits.insert(t.signer_index, t.clone());
                }
                SystemicTransaction::RevealRandom(t) => {
                    material.reveals.insert(t.commit_hash, t.private_key);
                }
                _ => {}
            }
        }
    }

    // PrivateKeyTransaction carries no signer index; the matching signer is
    // recovered by deriving the public key and looking it up among the
    // era's published ephemeral pubkeys.
    for signed in blocks {
        for tx in &signed.block.systemic_txs {
            if let SystemicTransaction::PrivateKey(t) = tx {
                if let Ok(keypair) = aeon_crypto::Keypair::from_private_key(&t.private_key) {
                    let derived = keypair.public_key();
                    if let Some((&idx, _)) = material
                        .ephemeral_pubkeys
                        .iter()
                        .find(|(_, pk)| **pk == derived)
                    {
                        material.ephemeral_privkeys.insert(idx, t.private_key);
                    }
                }
            }
        }
    }

    material
}

fn recover_by_reveal(commit: &aeon_types::CommitRandomTransaction, material: &EraMaterial) -> Option<[u8; 32]> {
    let reference = commit.reference_hash();
    let private_key = material.reveals.get(&reference)?;
    let plaintext = decrypt(private_key, &commit.encrypted_random).ok()?;
    if plaintext.len() != 32 {
        return None;
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&plaintext);
    Some(out)
}

fn recover_by_recombination(dealer_index: u32, material: &EraMaterial) -> Option<[u8; 32]> {
    let pieces = material.splits.get(&dealer_index)?;
    let mut decrypted_shares = Vec::new();
    for (recipient_index, piece) in pieces.iter().enumerate() {
        let Some(ciphertext) = piece else { continue };
        let Some(private_key) = material.ephemeral_privkeys.get(&(recipient_index as u32)) else {
            continue;
        };
        if let Ok(share) = decrypt(private_key, ciphertext) {
            decrypted_shares.push(share);
        }
    }
    recombine_secret(&decrypted_shares).ok()
}

/// Derives the entropy seed for the era that `blocks` (already filtered to
/// exactly that era, across a single fork) belong to. `active_validator_count`
/// is the size of the validator set the threshold is computed against.
/// Returns `None` if fewer than `threshold(n)` contributions can be
/// recovered — the era is unseeded.
pub fn derive_era_seed(blocks: &[&SignedBlock], active_validator_count: usize) -> Option<[u8; 32]> {
    let material = collect_era_material(blocks);

    let mut contributions = Vec::new();
    for (&signer_index, commit) in &material.commits {
        let contribution = recover_by_reveal(commit, &material)
            .or_else(|| recover_by_recombination(signer_index, &material));
        if let Some(c) = contribution {
            contributions.push(c);
        }
    }

    let threshold = ConsensusParams::threshold(active_validator_count);
    if contributions.len() < threshold {
        tracing::warn!(
            recovered = contributions.len(),
            threshold,
            "too few entropy contributions recovered, era is unseeded"
        );
        return None;
    }

    let mut seed = [0u8; 32];
    for contribution in &contributions {
        for (s, c) in seed.iter_mut().zip(contribution.iter()) {
            *s ^= c;
        }
    }
    Some(seed)
}

/// The documented fallback ordering for an unseeded era: hash the prior
/// era's seed together with the era number, so different unseeded eras
/// still diverge from one another.
pub fn fallback_seed(prev_seed: &[u8; 32], era_number: u64) -> [u8; 32] {
    sha256(&[prev_seed.as_slice(), &era_number.to_be_bytes()].concat())
}

/// Partitions `blocks` down to those belonging to era `era_number`.
pub fn blocks_in_era<'a>(
    blocks: &[&'a SignedBlock],
    era_number: u64,
    params: &ConsensusParams,
) -> Vec<&'a SignedBlock> {
    blocks
        .iter()
        .copied()
        .filter(|b| {
            let ts = timeslot_of(b.block.timestamp, params);
            epoch_number_of(ts, params) == era_number
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeon_crypto::{encrypt, split_secret, Keypair};
    use aeon_types::{CommitRandomTransaction, PrivateKeyTransaction, PublicKeyTransaction, RevealRandomTransaction, Signature};

    fn sig() -> Signature {
        Signature::from_slice(&[0u8; Signature::LEN]).unwrap()
    }

    fn block_with(txs: Vec<SystemicTransaction>) -> SignedBlock {
        SignedBlock {
            block: aeon_types::Block {
                prev_hashes: vec![],
                timestamp: 0,
                systemic_txs: txs,
                payment_txs: vec![],
            },
            signature: sig(),
        }
    }

    #[test]
    fn recovers_contribution_via_matching_reveal() {
        let reveal_keypair = Keypair::generate();
        let random = [7u8; 32];
        let encrypted_random = encrypt(&reveal_keypair.public_key(), &random).unwrap();
        let commit = CommitRandomTransaction {
            encrypted_random,
            signer_index: 0,
            signature: sig(),
        };
        let reveal = RevealRandomTransaction {
            commit_hash: commit.reference_hash(),
            private_key: reveal_keypair.private_key(),
        };
        let block = block_with(vec![
            SystemicTransaction::CommitRandom(commit),
            SystemicTransaction::RevealRandom(reveal),
        ]);
        let seed = derive_era_seed(&[&block], 1).unwrap();
        assert_eq!(seed, random);
    }

    #[test]
    fn recovers_non_revealer_via_shamir_recombination() {
        // Dealer (signer 0) splits a secret 2-of-2 and distributes it to
        // recipients 1 and 2, who each disclose their ephemeral private
        // key in PRIVATE, letting anyone recombine the dealer's secret
        // even though the dealer never reveals directly.
        let secret = [9u8; 32];
        let shares = split_secret(&secret, 2, 2).unwrap();

        let kp1 = Keypair::generate();
        let kp2 = Keypair::generate();

        let piece1 = encrypt(&kp1.public_key(), &shares[0]).unwrap();
        let piece2 = encrypt(&kp2.public_key(), &shares[1]).unwrap();

        let dummy_commit = CommitRandomTransaction {
            encrypted_random: vec![0u8; 32],
            signer_index: 0,
            signature: sig(),
        };

        let block = block_with(vec![
            SystemicTransaction::PublicKey(PublicKeyTransaction {
                generated_pubkey: kp1.public_key(),
                signer_index: 1,
                signature: sig(),
            }),
            SystemicTransaction::PublicKey(PublicKeyTransaction {
                generated_pubkey: kp2.public_key(),
                signer_index: 2,
                signature: sig(),
            }),
            SystemicTransaction::SplitRandom(aeon_types::SplitRandomTransaction {
                pieces: vec![None, Some(piece1), Some(piece2)],
                signer_index: 0,
                signature: sig(),
            }),
            SystemicTransaction::CommitRandom(dummy_commit),
            SystemicTransaction::PrivateKey(PrivateKeyTransaction {
                private_key: kp1.private_key(),
            }),
            SystemicTransaction::PrivateKey(PrivateKeyTransaction {
                private_key: kp2.private_key(),
            }),
        ]);

        let seed = derive_era_seed(&[&block], 1).unwrap();
        assert_eq!(seed, secret);
    }

    #[test]
    fn too_few_contributions_returns_none() {
        let block = block_with(vec![SystemicTransaction::CommitRandom(CommitRandomTransaction {
            encrypted_random: vec![1, 2, 3],
            signer_index: 0,
            signature: sig(),
        })]);
        assert!(derive_era_seed(&[&block], 10).is_none());
    }

    #[test]
    fn fallback_seed_diverges_by_era_number() {
        let prev = [1u8; 32];
        assert_ne!(fallback_seed(&prev, 1), fallback_seed(&prev, 2));
    }
}
