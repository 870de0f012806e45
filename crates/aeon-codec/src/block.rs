//! Block and signed-block framing (spec §6).
//!
//! Frame layout for a signed block is `signature ‖ block_body`, where
//! `block_body = timestamp_u32 ‖ u32 count_prev ‖ count_prev × 32-byte hash
//! ‖ u32 count_sys ‖ packed systemic_txs ‖ u32 count_pay ‖ packed
//! payment_txs`. The optional `block_signer_pubkey_hint` the spec allows
//! for is not produced here: signer identity is recovered by trying each
//! candidate key the permission schedule returns, so carrying a hint would
//! only be a size/verification-cost optimization, not something this
//! codec needs to round-trip.

use aeon_crypto::sha256;
use aeon_types::{Block, CodecError, Hash, SignedBlock};

use crate::framing::Reader;
use crate::tx;

/// Packs the unsigned body of a block. This is also the preimage of the
/// block hash.
pub fn pack_block(block: &Block) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&block.timestamp.to_be_bytes());

    out.extend_from_slice(&(block.prev_hashes.len() as u32).to_be_bytes());
    for hash in &block.prev_hashes {
        out.extend_from_slice(hash);
    }

    out.extend_from_slice(&(block.systemic_txs.len() as u32).to_be_bytes());
    for systemic in &block.systemic_txs {
        tx::pack_systemic(&mut out, systemic);
    }

    out.extend_from_slice(&(block.payment_txs.len() as u32).to_be_bytes());
    for payment in &block.payment_txs {
        tx::pack_payment(&mut out, payment);
    }

    out
}

/// Parses a block body out of `reader`, leaving the cursor positioned
/// right after the last payment transaction.
pub fn parse_block(reader: &mut Reader<'_>) -> Result<Block, CodecError> {
    let timestamp = reader.read_u32_be()?;

    let count_prev = reader.read_u32_be()?;
    let mut prev_hashes = Vec::with_capacity(count_prev as usize);
    for _ in 0..count_prev {
        prev_hashes.push(reader.read_fixed::<32>()?);
    }

    let count_sys = reader.read_u32_be()?;
    let mut systemic_txs = Vec::with_capacity(count_sys as usize);
    for _ in 0..count_sys {
        systemic_txs.push(tx::parse_systemic(reader)?);
    }

    let count_pay = reader.read_u32_be()?;
    let mut payment_txs = Vec::with_capacity(count_pay as usize);
    for _ in 0..count_pay {
        payment_txs.push(tx::parse_payment(reader)?);
    }

    Ok(Block {
        prev_hashes,
        timestamp,
        systemic_txs,
        payment_txs,
    })
}

/// The block's content address: SHA-256 over its canonical unsigned
/// packing. The signature covers this hash, not the raw bytes again.
pub fn hash_block(block: &Block) -> Hash {
    sha256(&pack_block(block))
}

/// Packs a full signed-block frame: `signature ‖ block_body`.
pub fn pack_signed_block(signed: &SignedBlock) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + 64);
    out.extend_from_slice(signed.signature.as_bytes());
    out.extend_from_slice(&pack_block(&signed.block));
    out
}

pub fn parse_signed_block(reader: &mut Reader<'_>) -> Result<SignedBlock, CodecError> {
    let signature = reader.read_fixed::<64>()?;
    let signature = aeon_types::Signature::from_slice(&signature)
        .expect("fixed-width read always produces the declared length");
    let block = parse_block(reader)?;
    Ok(SignedBlock { block, signature })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeon_types::Signature;

    #[test]
    fn signed_block_round_trips() {
        let block = Block::genesis(1_700_000_000);
        let signed = SignedBlock {
            block,
            signature: Signature::from_slice(&[7u8; Signature::LEN]).unwrap(),
        };
        let packed = pack_signed_block(&signed);
        let mut reader = Reader::new(&packed);
        let parsed = parse_signed_block(&mut reader).unwrap();
        assert_eq!(parsed, signed);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn hash_is_stable_across_repacks() {
        let block = Block::genesis(42);
        assert_eq!(hash_block(&block), hash_block(&block));
    }

    #[test]
    fn hash_changes_with_timestamp() {
        let a = Block::genesis(1);
        let b = Block::genesis(2);
        assert_ne!(hash_block(&a), hash_block(&b));
    }
}
