//! The validator-set registry is consumed as a static input (spec §1): this
//! crate only needs a shape to carry it in, not the logic that mutates it.

use crate::ids::PublicKey;

/// One entry of the active validator set at a given epoch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    pub pubkey: PublicKey,
    pub stake: u64,
}
