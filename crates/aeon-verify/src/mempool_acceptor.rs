//! Mempool-admission checks (spec §4.6(a)): cheap syntactic validation run
//! before a systemic transaction is allowed to sit in `aeon-mempool`.
//!
//! Kinds that carry no identifiable signer at this layer — reveals,
//! private-key disclosures, penalties, and penalty-gossip — skip the
//! signature/committee checks here; they are re-validated with full block
//! context by [`crate::in_block_acceptor::InBlockAcceptor`].

use aeon_crypto::{sha256, verify as crypto_verify};
use aeon_permissions::Permissions;
use aeon_types::{Hash, SystemicTransaction};

use crate::dedup::EraDuplicateTracker;
use crate::error::VerifyError;
use crate::signer_index_pubkey;

pub struct MempoolAcceptor;

impl MempoolAcceptor {
    /// `epoch_hash` is only consumed by `CommitRandomTransaction`, whose
    /// signing payload binds to it (spec §2 supplement).
    pub fn accept(
        tx: &SystemicTransaction,
        epoch_hash: &Hash,
        permissions: &Permissions,
        tracker: &mut EraDuplicateTracker,
    ) -> Result<(), VerifyError> {
        match tx {
            SystemicTransaction::PublicKey(t) => {
                let pubkey = signer_index_pubkey(permissions, t.signer_index)?;
                crypto_verify(&pubkey, &t.signing_hash(), &t.signature)
                    .map_err(|_| VerifyError::BadSignature)?;
            }
            SystemicTransaction::SplitRandom(t) => {
                let pubkey = signer_index_pubkey(permissions, t.signer_index)?;
                if !permissions.is_secret_sharer(&pubkey) {
                    return Err(VerifyError::NotInCommittee);
                }
                crypto_verify(&pubkey, &t.signing_hash(), &t.signature)
                    .map_err(|_| VerifyError::BadSignature)?;
            }
            SystemicTransaction::CommitRandom(t) => {
                let pubkey = signer_index_pubkey(permissions, t.signer_index)?;
                if !permissions.is_committer(&pubkey) {
                    return Err(VerifyError::NotInCommittee);
                }
                let digest = sha256(&t.signing_payload(epoch_hash));
                crypto_verify(&pubkey, &digest, &t.signature)
                    .map_err(|_| VerifyError::BadSignature)?;
            }
            SystemicTransaction::StakeHold(t) => {
                crypto_verify(&t.pubkey, &t.signing_hash(), &t.signature)
                    .map_err(|_| VerifyError::BadSignature)?;
            }
            SystemicTransaction::StakeRelease(t) => {
                crypto_verify(&t.pubkey, &t.signing_hash(), &t.signature)
                    .map_err(|_| VerifyError::BadSignature)?;
            }
            SystemicTransaction::NegativeGossip(t) => {
                let digest = aeon_codec::negative_gossip_signing_hash(t);
                crypto_verify(&t.pubkey, &digest, &t.signature)
                    .map_err(|_| VerifyError::BadSignature)?;
            }
            SystemicTransaction::PositiveGossip(t) => {
                let digest = aeon_codec::positive_gossip_signing_hash(t);
                crypto_verify(&t.pubkey, &digest, &t.signature)
                    .map_err(|_| VerifyError::BadSignature)?;
            }
            SystemicTransaction::RevealRandom(_)
            | SystemicTransaction::PrivateKey(_)
            | SystemicTransaction::Penalty(_)
            | SystemicTransaction::PenaltyGossip(_) => {}
        }

        if !tracker.observe(tx) {
            return Err(VerifyError::DuplicateSystemic);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeon_crypto::Keypair;
    use aeon_types::{PublicKeyTransaction, Signature, Validator};

    fn validators(keys: &[Keypair]) -> Vec<Validator> {
        keys.iter()
            .map(|k| Validator {
                pubkey: k.public_key(),
                stake: 100,
            })
            .collect()
    }

    #[test]
    fn well_formed_public_key_tx_is_accepted() {
        let kp = Keypair::generate();
        let vs = validators(std::slice::from_ref(&kp));
        let permissions = Permissions::compute([1u8; 32], &vs, 2).unwrap();

        let mut tx = PublicKeyTransaction {
            generated_pubkey: Keypair::generate().public_key(),
            signer_index: 0,
            signature: Signature::from_slice(&[0u8; Signature::LEN]).unwrap(),
        };
        tx.signature = kp.sign(&tx.signing_hash()).unwrap();

        let mut tracker = EraDuplicateTracker::new();
        let result = MempoolAcceptor::accept(
            &SystemicTransaction::PublicKey(tx),
            &[0u8; 32],
            &permissions,
            &mut tracker,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let kp = Keypair::generate();
        let vs = validators(std::slice::from_ref(&kp));
        let permissions = Permissions::compute([1u8; 32], &vs, 2).unwrap();

        let tx = PublicKeyTransaction {
            generated_pubkey: Keypair::generate().public_key(),
            signer_index: 0,
            signature: Signature::from_slice(&[9u8; Signature::LEN]).unwrap(),
        };

        let mut tracker = EraDuplicateTracker::new();
        let result = MempoolAcceptor::accept(
            &SystemicTransaction::PublicKey(tx),
            &[0u8; 32],
            &permissions,
            &mut tracker,
        );
        assert!(matches!(result, Err(VerifyError::BadSignature)));
    }

    #[test]
    fn second_public_key_tx_from_same_signer_is_rejected() {
        let kp = Keypair::generate();
        let vs = validators(std::slice::from_ref(&kp));
        let permissions = Permissions::compute([1u8; 32], &vs, 2).unwrap();

        let mut tx = PublicKeyTransaction {
            generated_pubkey: kp.public_key(),
            signer_index: 0,
            signature: Signature::from_slice(&[0u8; Signature::LEN]).unwrap(),
        };
        tx.signature = kp.sign(&tx.signing_hash()).unwrap();
        let systemic = SystemicTransaction::PublicKey(tx);

        let mut tracker = EraDuplicateTracker::new();
        MempoolAcceptor::accept(&systemic, &[0u8; 32], &permissions, &mut tracker).unwrap();
        let second = MempoolAcceptor::accept(&systemic, &[0u8; 32], &permissions, &mut tracker);
        assert!(matches!(second, Err(VerifyError::DuplicateSystemic)));
    }

    #[test]
    fn out_of_committee_signer_index_is_rejected() {
        let kp = Keypair::generate();
        let vs = validators(std::slice::from_ref(&kp));
        let permissions = Permissions::compute([1u8; 32], &vs, 2).unwrap();

        let tx = PublicKeyTransaction {
            generated_pubkey: kp.public_key(),
            signer_index: 5,
            signature: Signature::from_slice(&[0u8; Signature::LEN]).unwrap(),
        };

        let mut tracker = EraDuplicateTracker::new();
        let result = MempoolAcceptor::accept(
            &SystemicTransaction::PublicKey(tx),
            &[0u8; 32],
            &permissions,
            &mut tracker,
        );
        assert!(matches!(result, Err(VerifyError::NotInCommittee)));
    }
}
