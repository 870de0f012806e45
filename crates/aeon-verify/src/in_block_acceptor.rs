//! In-block acceptance (spec §4.6(b)): checks that only make sense once a
//! systemic transaction sits inside a specific block, at a specific round,
//! alongside the rest of that block's context.

use std::collections::HashSet;

use aeon_types::{Hash, Round, SystemicTransaction};

use crate::error::VerifyError;

pub struct InBlockAcceptor;

impl InBlockAcceptor {
    /// `known_commit_hashes` is the set of `CommitRandomTransaction::reference_hash`
    /// values seen earlier this era (for validating reveals);
    /// `known_conflict_hashes` is every block hash the conflict watcher has
    /// actually recorded (for validating penalties).
    pub fn accept(
        tx: &SystemicTransaction,
        block_round: Round,
        known_commit_hashes: &HashSet<Hash>,
        known_conflict_hashes: &HashSet<Hash>,
    ) -> Result<(), VerifyError> {
        if let Some(legal) = tx.legal_round() {
            if legal != block_round {
                return Err(VerifyError::OutOfRound(block_round));
            }
        }

        match tx {
            SystemicTransaction::RevealRandom(t) => {
                if !known_commit_hashes.contains(&t.commit_hash) {
                    return Err(VerifyError::UnknownCommit);
                }
            }
            SystemicTransaction::Penalty(t) => {
                if t.conflicts.is_empty() {
                    return Err(VerifyError::EmptyConflictSet);
                }
                if !t.conflicts.iter().all(|c| known_conflict_hashes.contains(c)) {
                    return Err(VerifyError::UnknownConflictHash);
                }
            }
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeon_types::{
        CommitRandomTransaction, PenaltyTransaction, PrivateKeyTransaction, PrivateKey,
        RevealRandomTransaction,
    };

    #[test]
    fn reveal_out_of_round_is_rejected() {
        let tx = SystemicTransaction::RevealRandom(RevealRandomTransaction {
            commit_hash: [1u8; 32],
            private_key: PrivateKey::from_slice(&[1u8; PrivateKey::LEN]).unwrap(),
        });
        let known_commits = HashSet::from([[1u8; 32]]);
        let result = InBlockAcceptor::accept(&tx, Round::Public, &known_commits, &HashSet::new());
        assert!(matches!(result, Err(VerifyError::OutOfRound(Round::Public))));
    }

    #[test]
    fn reveal_with_unknown_commit_is_rejected() {
        let tx = SystemicTransaction::RevealRandom(RevealRandomTransaction {
            commit_hash: [9u8; 32],
            private_key: PrivateKey::from_slice(&[1u8; PrivateKey::LEN]).unwrap(),
        });
        let result = InBlockAcceptor::accept(&tx, Round::Reveal, &HashSet::new(), &HashSet::new());
        assert!(matches!(result, Err(VerifyError::UnknownCommit)));
    }

    #[test]
    fn reveal_matching_known_commit_is_accepted() {
        let commit = CommitRandomTransaction {
            encrypted_random: vec![1, 2, 3],
            signer_index: 0,
            signature: aeon_types::Signature::from_slice(&[0u8; aeon_types::Signature::LEN]).unwrap(),
        };
        let reference = commit.reference_hash();
        let tx = SystemicTransaction::RevealRandom(RevealRandomTransaction {
            commit_hash: reference,
            private_key: PrivateKey::from_slice(&[1u8; PrivateKey::LEN]).unwrap(),
        });
        let known_commits = HashSet::from([reference]);
        let result = InBlockAcceptor::accept(&tx, Round::Reveal, &known_commits, &HashSet::new());
        assert!(result.is_ok());
    }

    #[test]
    fn penalty_with_empty_conflict_set_is_rejected() {
        let tx = SystemicTransaction::Penalty(PenaltyTransaction {
            conflicts: vec![],
            signature: aeon_types::Signature::from_slice(&[0u8; aeon_types::Signature::LEN]).unwrap(),
        });
        let result = InBlockAcceptor::accept(&tx, Round::Private, &HashSet::new(), &HashSet::new());
        assert!(matches!(result, Err(VerifyError::EmptyConflictSet)));
    }

    #[test]
    fn penalty_citing_unknown_hash_is_rejected() {
        let tx = SystemicTransaction::Penalty(PenaltyTransaction {
            conflicts: vec![[3u8; 32]],
            signature: aeon_types::Signature::from_slice(&[0u8; aeon_types::Signature::LEN]).unwrap(),
        });
        let result = InBlockAcceptor::accept(&tx, Round::Private, &HashSet::new(), &HashSet::new());
        assert!(matches!(result, Err(VerifyError::UnknownConflictHash)));
    }

    #[test]
    fn penalty_citing_known_hashes_is_accepted() {
        let tx = SystemicTransaction::Penalty(PenaltyTransaction {
            conflicts: vec![[3u8; 32]],
            signature: aeon_types::Signature::from_slice(&[0u8; aeon_types::Signature::LEN]).unwrap(),
        });
        let known_conflicts = HashSet::from([[3u8; 32]]);
        let result = InBlockAcceptor::accept(&tx, Round::Private, &HashSet::new(), &known_conflicts);
        assert!(result.is_ok());
    }

    #[test]
    fn private_key_in_correct_round_is_accepted() {
        let tx = SystemicTransaction::PrivateKey(PrivateKeyTransaction {
            private_key: PrivateKey::from_slice(&[2u8; PrivateKey::LEN]).unwrap(),
        });
        let result = InBlockAcceptor::accept(&tx, Round::Private, &HashSet::new(), &HashSet::new());
        assert!(result.is_ok());
    }
}
