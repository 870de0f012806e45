//! Round-specific emission (spec §4.7.1): idempotent per era, run once per
//! tick regardless of whether this node is the elected signer this
//! timeslot — every honest validator participates in the beacon protocol,
//! only block production is gated on election.

use aeon_crypto::{encrypt, split_secret, Keypair};
use aeon_permissions::Permissions;
use aeon_types::{
    CommitRandomTransaction, Hash, PrivateKeyTransaction, PublicKeyTransaction,
    RevealRandomTransaction, Round, SplitRandomTransaction, SystemicTransaction,
};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::state::EraKeyState;

fn random_32() -> [u8; 32] {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// PUBLIC round: generate and broadcast this era's ephemeral keypair.
pub(crate) fn emit_public(state: &mut EraKeyState, local_index: u32) -> Option<SystemicTransaction> {
    if !state.take_public_key_latch() {
        return None;
    }
    let keypair = Keypair::generate();
    let generated_pubkey = keypair.public_key();
    state.ephemeral_keypair = Some(keypair);

    let mut tx = PublicKeyTransaction {
        generated_pubkey,
        signer_index: local_index,
        signature: aeon_types::Signature::from_slice(&[0u8; aeon_types::Signature::LEN]).unwrap(),
    };
    // Signed by the caller once the local long-lived keypair is available;
    // see `sign_public_key_transaction`.
    tx.signature = sign_placeholder();
    Some(SystemicTransaction::PublicKey(tx))
}

fn sign_placeholder() -> aeon_types::Signature {
    aeon_types::Signature::from_slice(&[0u8; aeon_types::Signature::LEN]).unwrap()
}

/// Signs a freshly built `PublicKeyTransaction` with the node's permanent
/// validator key, the key whose `signer_index` the committee actually
/// recognizes.
pub(crate) fn sign_public_key_transaction(
    local_keypair: &Keypair,
    mut tx: PublicKeyTransaction,
) -> Result<PublicKeyTransaction, aeon_crypto::CryptoError> {
    tx.signature = local_keypair.sign(&tx.signing_hash())?;
    Ok(tx)
}

/// SECRETSHARE round: split a fresh 32-byte secret `k`-of-`n` among the
/// randomizer committee that served last round (PUBLIC), encrypting each
/// share under that recipient's published ephemeral public key.
pub(crate) fn emit_secretshare(
    state: &mut EraKeyState,
    permissions: &Permissions,
    local_index: u32,
) -> Option<SystemicTransaction> {
    if !state.take_split_random_latch() {
        return None;
    }
    let randomizers = permissions.randomizer_pubkeys_for_round(Round::Public);
    let n = randomizers.len();
    if n == 0 {
        return None;
    }
    let k = aeon_api::ConsensusParams::threshold(n) as u8;
    let secret = random_32();
    let Ok(shares) = split_secret(&secret, k, n as u8) else {
        tracing::warn!(n, k, "failed to split secret-share secret");
        return None;
    };

    let pieces: Vec<Option<Vec<u8>>> = randomizers
        .iter()
        .zip(shares)
        .map(|(pubkey, share)| {
            let Some(index) = permissions.index_of(pubkey) else {
                return None;
            };
            let ephemeral = state.ephemeral_pubkeys.get(&index)?;
            encrypt(ephemeral, &share).ok()
        })
        .collect();

    let tx = SplitRandomTransaction {
        pieces,
        signer_index: local_index,
        signature: sign_placeholder(),
    };
    Some(SystemicTransaction::SplitRandom(tx))
}

pub(crate) fn sign_split_random_transaction(
    local_keypair: &Keypair,
    mut tx: SplitRandomTransaction,
) -> Result<SplitRandomTransaction, aeon_crypto::CryptoError> {
    tx.signature = local_keypair.sign(&tx.signing_hash())?;
    Ok(tx)
}

/// COMMIT round: generate a fresh keypair, encrypt 32 random bytes under
/// its public half, and stash the private half as the pending reveal.
pub(crate) fn emit_commit(
    state: &mut EraKeyState,
    local_index: u32,
) -> Option<CommitRandomTransaction> {
    if !state.take_commit_latch() {
        return None;
    }
    let keypair = Keypair::generate();
    let random = random_32();
    let Ok(encrypted_random) = encrypt(&keypair.public_key(), &random) else {
        tracing::warn!("failed to encrypt commit-round random bytes");
        return None;
    };

    let tx = CommitRandomTransaction {
        encrypted_random,
        signer_index: local_index,
        signature: sign_placeholder(),
    };
    // `reference_hash` depends on the signature, which isn't known until
    // `sign_commit_random_transaction` runs; this placeholder reference is
    // overwritten there once the real signature is attached.
    state.pending_reveal = Some(RevealRandomTransaction {
        commit_hash: tx.reference_hash(),
        private_key: keypair.private_key(),
    });
    Some(tx)
}

pub(crate) fn sign_commit_random_transaction(
    local_keypair: &Keypair,
    epoch_hash: &Hash,
    mut tx: CommitRandomTransaction,
    state: &mut EraKeyState,
) -> Result<CommitRandomTransaction, aeon_crypto::CryptoError> {
    let digest = aeon_crypto::sha256(&tx.signing_payload(epoch_hash));
    tx.signature = local_keypair.sign(&digest)?;
    if let Some(pending) = state.pending_reveal.as_mut() {
        pending.commit_hash = tx.reference_hash();
    }
    Ok(tx)
}

/// REVEAL round: broadcast the pending reveal stashed by COMMIT, then
/// forget it — a validator only ever has one commit, and therefore one
/// reveal, open per era.
pub(crate) fn emit_reveal(state: &mut EraKeyState) -> Option<SystemicTransaction> {
    if !state.take_reveal_latch() {
        return None;
    }
    state
        .pending_reveal
        .take()
        .map(SystemicTransaction::RevealRandom)
}

/// PRIVATE round: disclose this era's PUBLIC-round ephemeral private key.
/// Attached during block signing rather than broadcast eagerly like the
/// other rounds (spec §4.7.2), but latched the same way so a node that
/// misses its own signing slot this round doesn't disclose twice later.
pub(crate) fn emit_private_key(state: &mut EraKeyState) -> Option<SystemicTransaction> {
    if !state.take_private_key_latch() {
        return None;
    }
    state.ephemeral_keypair.as_ref().map(|kp| {
        SystemicTransaction::PrivateKey(PrivateKeyTransaction {
            private_key: kp.private_key(),
        })
    })
}
