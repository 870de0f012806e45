//! Core data structures and error types for the aeon consensus engine.
//!
//! This crate mirrors the role `ioi-types` plays in the `ioi` kernel: it
//! has almost no dependencies of its own and defines only the shapes
//! every other crate in the workspace agrees on, so that a change to the
//! wire format or the error taxonomy has exactly one place of origin.

pub mod block;
pub mod error;
pub mod ids;
pub mod round;
pub mod tx;
pub mod validator;

pub use block::{Block, SignedBlock};
pub use error::{CodecError, ConsensusError, ErrorCode};
pub use ids::{Hash, PrivateKey, PublicKey, Signature, HASH_LEN, PRIVKEY_LEN, PUBKEY_LEN, SIGNATURE_LEN};
pub use round::Round;
pub use tx::{
    CommitRandomTransaction, NegativeGossipTransaction, PaymentTransaction,
    PenaltyGossipTransaction, PenaltyTransaction, PositiveGossipTransaction, PrivateKeyTransaction,
    PublicKeyTransaction, RevealRandomTransaction, SplitRandomTransaction, StakeHoldTransaction,
    StakeReleaseTransaction, SystemicTransaction, TxIn, TxOut,
};
pub use validator::Validator;
