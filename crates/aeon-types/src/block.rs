//! Block and signed-block structures (spec §3).
//!
//! A block carries no epoch number of its own: its era is derived from its
//! timestamp relative to genesis by `aeon-epoch`. Hashing and wire packing
//! both live in `aeon-codec`, which owns the canonical byte layout.

use crate::ids::{Hash, Signature};
use crate::tx::{PaymentTransaction, SystemicTransaction};

/// An unsigned block: a DAG node linking to one or more parents.
///
/// `prev_hashes` may contain more than one hash both because this is a DAG
/// by design (honest re-convergence links in every sibling top) and
/// because nothing stops a malicious signer from linking to an arbitrary
/// set of hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub prev_hashes: Vec<Hash>,
    pub timestamp: u32,
    pub systemic_txs: Vec<SystemicTransaction>,
    pub payment_txs: Vec<PaymentTransaction>,
}

impl Block {
    pub fn genesis(timestamp: u32) -> Self {
        Block {
            prev_hashes: Vec::new(),
            timestamp,
            systemic_txs: Vec::new(),
            payment_txs: Vec::new(),
        }
    }
}

/// A `Block` plus a signature by one of the signers permitted to sign that
/// timeslot. The signer's identity is not carried explicitly: verification
/// tries each candidate public key returned by the permission schedule and
/// accepts the first match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBlock {
    pub block: Block,
    pub signature: Signature,
}
