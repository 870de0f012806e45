//! Pending transaction storage (spec §4.5).
//!
//! Systemic transactions are partitioned three ways: by the round their
//! kind is legal in (public keys, shares, commits, reveals, private keys,
//! penalties), as gossip (negative/positive/penalty-gossip, which ride
//! along in whichever round the signer happens to produce a block in),
//! and as stake mutations (held/released, only recognized and routed per
//! spec §1, never interpreted here). Payments queue in arrival order.

use std::collections::VecDeque;

use aeon_types::{PaymentTransaction, Round, SystemicTransaction};

#[derive(Debug, Default)]
pub struct Mempool {
    public_key: Vec<SystemicTransaction>,
    split_random: Vec<SystemicTransaction>,
    commit_random: Vec<SystemicTransaction>,
    reveal_random: Vec<SystemicTransaction>,
    private_key_and_penalty: Vec<SystemicTransaction>,
    gossip: Vec<SystemicTransaction>,
    stake_mutations: Vec<SystemicTransaction>,
    payments: VecDeque<PaymentTransaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes a systemic transaction into the bucket matching its kind.
    pub fn insert_systemic(&mut self, tx: SystemicTransaction) {
        match &tx {
            SystemicTransaction::PublicKey(_) => self.public_key.push(tx),
            SystemicTransaction::SplitRandom(_) => self.split_random.push(tx),
            SystemicTransaction::CommitRandom(_) => self.commit_random.push(tx),
            SystemicTransaction::RevealRandom(_) => self.reveal_random.push(tx),
            SystemicTransaction::PrivateKey(_) | SystemicTransaction::Penalty(_) => {
                self.private_key_and_penalty.push(tx)
            }
            SystemicTransaction::StakeHold(_) | SystemicTransaction::StakeRelease(_) => {
                self.stake_mutations.push(tx)
            }
            SystemicTransaction::NegativeGossip(_)
            | SystemicTransaction::PositiveGossip(_)
            | SystemicTransaction::PenaltyGossip(_) => self.gossip.push(tx),
        }
    }

    pub fn insert_payment(&mut self, tx: PaymentTransaction) {
        self.payments.push_back(tx);
    }

    /// Returns and removes every systemic transaction legal to include in
    /// a block produced during `round`.
    pub fn pop_round_systemic(&mut self, round: Round) -> Vec<SystemicTransaction> {
        match round {
            Round::Public => std::mem::take(&mut self.public_key),
            Round::SecretShare => std::mem::take(&mut self.split_random),
            Round::Commit => std::mem::take(&mut self.commit_random),
            Round::Reveal => std::mem::take(&mut self.reveal_random),
            Round::Private => std::mem::take(&mut self.private_key_and_penalty),
            Round::Final => Vec::new(),
        }
    }

    /// Drains every accumulated gossip transaction, regardless of round.
    pub fn pop_current_gossips(&mut self) -> Vec<SystemicTransaction> {
        std::mem::take(&mut self.gossip)
    }

    /// Drains accumulated stake-hold/release transactions, to be
    /// aggregated at the next epoch boundary.
    pub fn pop_stake_mutations(&mut self) -> Vec<SystemicTransaction> {
        std::mem::take(&mut self.stake_mutations)
    }

    /// Pops up to `limit` queued payment transactions, oldest first.
    pub fn pop_payments(&mut self, limit: usize) -> Vec<PaymentTransaction> {
        let n = limit.min(self.payments.len());
        self.payments.drain(..n).collect()
    }

    /// Clears every round-keyed systemic bucket and the gossip backlog.
    /// Called in the FINAL round to drop stale era state; stake mutations
    /// and payments are untouched since they aren't era-scoped.
    pub fn remove_all_systemic(&mut self) {
        self.public_key.clear();
        self.split_random.clear();
        self.commit_random.clear();
        self.reveal_random.clear();
        self.private_key_and_penalty.clear();
        self.gossip.clear();
        tracing::debug!("cleared stale era mempool state");
    }

    pub fn payment_queue_len(&self) -> usize {
        self.payments.len()
    }

    /// Removes every transaction in `included` from whichever bucket it
    /// would otherwise sit in. Called after a received block is accepted
    /// into the DAG (spec §4.7.3), so the node doesn't keep carrying
    /// transactions someone else already landed on-chain.
    pub fn remove_included_systemic(&mut self, included: &[SystemicTransaction]) {
        for bucket in [
            &mut self.public_key,
            &mut self.split_random,
            &mut self.commit_random,
            &mut self.reveal_random,
            &mut self.private_key_and_penalty,
            &mut self.gossip,
        ] {
            bucket.retain(|tx| !included.contains(tx));
        }
    }

    /// Drops queued payments that a just-accepted block already included,
    /// the payment-queue counterpart to [`Mempool::remove_included_systemic`].
    pub fn remove_included_payments(&mut self, included: &[PaymentTransaction]) {
        self.payments.retain(|tx| !included.contains(tx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeon_types::{CommitRandomTransaction, NegativeGossipTransaction, PublicKey, Signature, TxIn, TxOut};

    fn sig() -> Signature {
        Signature::from_slice(&[1u8; Signature::LEN]).unwrap()
    }

    fn pubkey() -> PublicKey {
        PublicKey::from_slice(&[2u8; PublicKey::LEN]).unwrap()
    }

    #[test]
    fn pop_round_systemic_only_returns_matching_kind() {
        let mut mempool = Mempool::new();
        mempool.insert_systemic(SystemicTransaction::CommitRandom(CommitRandomTransaction {
            encrypted_random: vec![1, 2, 3],
            signer_index: 0,
            signature: sig(),
        }));
        assert!(mempool.pop_round_systemic(Round::Public).is_empty());
        assert_eq!(mempool.pop_round_systemic(Round::Commit).len(), 1);
        assert!(mempool.pop_round_systemic(Round::Commit).is_empty());
    }

    #[test]
    fn gossip_is_separate_from_round_buckets() {
        let mut mempool = Mempool::new();
        mempool.insert_systemic(SystemicTransaction::NegativeGossip(NegativeGossipTransaction {
            pubkey: pubkey(),
            timestamp: 10,
            block_number: 1,
            signature: sig(),
        }));
        assert!(mempool.pop_round_systemic(Round::Public).is_empty());
        assert_eq!(mempool.pop_current_gossips().len(), 1);
    }

    #[test]
    fn remove_all_systemic_clears_round_buckets_but_not_payments() {
        let mut mempool = Mempool::new();
        mempool.insert_systemic(SystemicTransaction::CommitRandom(CommitRandomTransaction {
            encrypted_random: vec![],
            signer_index: 0,
            signature: sig(),
        }));
        mempool.insert_payment(PaymentTransaction {
            inputs: vec![TxIn {
                prev_tx_hash: [0u8; 32],
                output_index: 0,
            }],
            outputs: vec![TxOut {
                amount: 1,
                recipient: [0u8; 32],
            }],
            signature: sig(),
        });
        mempool.remove_all_systemic();
        assert!(mempool.pop_round_systemic(Round::Commit).is_empty());
        assert_eq!(mempool.payment_queue_len(), 1);
    }

    #[test]
    fn pop_payments_respects_limit_and_fifo_order() {
        let mut mempool = Mempool::new();
        for i in 0..3u64 {
            mempool.insert_payment(PaymentTransaction {
                inputs: vec![],
                outputs: vec![TxOut {
                    amount: i,
                    recipient: [0u8; 32],
                }],
                signature: sig(),
            });
        }
        let popped = mempool.pop_payments(2);
        assert_eq!(popped.len(), 2);
        assert_eq!(popped[0].outputs[0].amount, 0);
        assert_eq!(popped[1].outputs[0].amount, 1);
        assert_eq!(mempool.payment_queue_len(), 1);
    }
}
