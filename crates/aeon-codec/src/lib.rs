//! Fixed-width wire framing for aeon blocks and transactions (spec §6).
//!
//! The fixed-width, big-endian layout the wire format demands isn't what a
//! general-purpose derive codec produces byte for byte, so this crate is
//! hand-rolled: a `Reader` cursor plus a `pack`/`parse` free function per
//! framed type, the same naming convention the teacher's canonical codec
//! module uses.

pub mod block;
pub mod framing;
pub mod tx;

pub use block::{hash_block, pack_block, pack_signed_block, parse_block, parse_signed_block};
pub use framing::{write_lp_bytes, Reader};
pub use tx::{
    negative_gossip_signing_hash, pack_payment, pack_systemic, parse_payment, parse_systemic,
    positive_gossip_signing_hash,
};
