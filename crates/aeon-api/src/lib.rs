//! Shared traits and protocol parameters for the aeon consensus engine.
//!
//! This crate is the seam every other `aeon-*` crate builds against, the
//! same role `ioi-api` plays for the rest of the `ioi` kernel: it carries
//! no DAG, no mempool, no crypto implementation of its own, only the
//! contracts those crates satisfy and the numeric parameters that govern
//! timeslots, rounds, and eras.

pub mod params;
pub mod traits;

pub use params::ConsensusParams;
pub use traits::{BlockStore, EntropySource, Round, StakeView};
