//! Transaction framing (spec §6): a leading tag byte identifies the kind,
//! followed by the kind-specific body. Gossip variants additionally expose
//! a `*_signing_hash` function that hashes only their logical fields,
//! distinct from `pack`, which appends the signature — the original
//! implementation signs over the former and transmits the latter.

use aeon_crypto::sha256;
use aeon_types::{
    CodecError, CommitRandomTransaction, Hash, NegativeGossipTransaction, PaymentTransaction,
    PenaltyGossipTransaction, PenaltyTransaction, PositiveGossipTransaction, PrivateKey,
    PrivateKeyTransaction, PublicKey, PublicKeyTransaction, RevealRandomTransaction, Signature,
    SplitRandomTransaction, StakeHoldTransaction, StakeReleaseTransaction, SystemicTransaction,
    TxIn, TxOut,
};

use crate::block;
use crate::framing::{write_lp_bytes, Reader};

const TAG_PUBLIC_KEY: u8 = 0;
const TAG_SPLIT_RANDOM: u8 = 1;
const TAG_COMMIT_RANDOM: u8 = 2;
const TAG_REVEAL_RANDOM: u8 = 3;
const TAG_PRIVATE_KEY: u8 = 4;
const TAG_STAKE_HOLD: u8 = 5;
const TAG_STAKE_RELEASE: u8 = 6;
const TAG_PENALTY: u8 = 7;
const TAG_NEGATIVE_GOSSIP: u8 = 8;
const TAG_POSITIVE_GOSSIP: u8 = 9;
const TAG_PENALTY_GOSSIP: u8 = 10;

fn read_pubkey(reader: &mut Reader<'_>) -> Result<PublicKey, CodecError> {
    let bytes = reader.read_fixed::<33>()?;
    PublicKey::from_slice(&bytes).ok_or(CodecError::BadFixedWidth {
        expected: aeon_types::PUBKEY_LEN,
        got: bytes.len(),
    })
}

fn read_signature(reader: &mut Reader<'_>) -> Result<Signature, CodecError> {
    let bytes = reader.read_fixed::<64>()?;
    Signature::from_slice(&bytes).ok_or(CodecError::BadFixedWidth {
        expected: aeon_types::SIGNATURE_LEN,
        got: bytes.len(),
    })
}

fn read_private_key(reader: &mut Reader<'_>) -> Result<PrivateKey, CodecError> {
    let bytes = reader.read_fixed::<32>()?;
    PrivateKey::from_slice(&bytes).ok_or(CodecError::BadFixedWidth {
        expected: aeon_types::PRIVKEY_LEN,
        got: bytes.len(),
    })
}

pub fn pack_systemic(out: &mut Vec<u8>, tx: &SystemicTransaction) {
    match tx {
        SystemicTransaction::PublicKey(t) => {
            out.push(TAG_PUBLIC_KEY);
            out.extend_from_slice(t.generated_pubkey.as_bytes());
            out.extend_from_slice(&t.signer_index.to_be_bytes());
            out.extend_from_slice(t.signature.as_bytes());
        }
        SystemicTransaction::SplitRandom(t) => {
            out.push(TAG_SPLIT_RANDOM);
            out.extend_from_slice(&t.signer_index.to_be_bytes());
            out.extend_from_slice(t.signature.as_bytes());
            out.extend_from_slice(&(t.pieces.len() as u32).to_be_bytes());
            for piece in &t.pieces {
                match piece {
                    Some(bytes) => {
                        out.push(1);
                        write_lp_bytes(out, bytes);
                    }
                    None => out.push(0),
                }
            }
        }
        SystemicTransaction::CommitRandom(t) => {
            out.push(TAG_COMMIT_RANDOM);
            out.extend_from_slice(&t.signer_index.to_be_bytes());
            out.extend_from_slice(t.signature.as_bytes());
            write_lp_bytes(out, &t.encrypted_random);
        }
        SystemicTransaction::RevealRandom(t) => {
            out.push(TAG_REVEAL_RANDOM);
            out.extend_from_slice(&t.commit_hash);
            out.extend_from_slice(t.private_key.as_bytes());
        }
        SystemicTransaction::PrivateKey(t) => {
            out.push(TAG_PRIVATE_KEY);
            out.extend_from_slice(t.private_key.as_bytes());
        }
        SystemicTransaction::StakeHold(t) => {
            out.push(TAG_STAKE_HOLD);
            out.extend_from_slice(&t.amount.to_be_bytes());
            out.extend_from_slice(t.pubkey.as_bytes());
            out.extend_from_slice(t.signature.as_bytes());
        }
        SystemicTransaction::StakeRelease(t) => {
            out.push(TAG_STAKE_RELEASE);
            out.extend_from_slice(t.pubkey.as_bytes());
            out.extend_from_slice(t.signature.as_bytes());
        }
        SystemicTransaction::Penalty(t) => {
            out.push(TAG_PENALTY);
            out.extend_from_slice(&(t.conflicts.len() as u32).to_be_bytes());
            for hash in &t.conflicts {
                out.extend_from_slice(hash);
            }
            out.extend_from_slice(t.signature.as_bytes());
        }
        SystemicTransaction::NegativeGossip(t) => {
            out.push(TAG_NEGATIVE_GOSSIP);
            out.extend_from_slice(t.pubkey.as_bytes());
            out.extend_from_slice(&t.timestamp.to_be_bytes());
            out.extend_from_slice(&t.block_number.to_be_bytes());
            out.extend_from_slice(t.signature.as_bytes());
        }
        SystemicTransaction::PositiveGossip(t) => {
            out.push(TAG_POSITIVE_GOSSIP);
            out.extend_from_slice(t.pubkey.as_bytes());
            out.extend_from_slice(&t.timestamp.to_be_bytes());
            out.extend_from_slice(&t.block_hash);
            out.extend_from_slice(t.signature.as_bytes());
            out.extend_from_slice(&block::pack_signed_block(&t.signed_block));
        }
        SystemicTransaction::PenaltyGossip(t) => {
            out.push(TAG_PENALTY_GOSSIP);
            out.extend_from_slice(&t.positive);
            out.extend_from_slice(&t.negative);
            out.extend_from_slice(t.signature.as_bytes());
        }
    }
}

pub fn parse_systemic(reader: &mut Reader<'_>) -> Result<SystemicTransaction, CodecError> {
    let tag = reader.read_u8()?;
    match tag {
        TAG_PUBLIC_KEY => {
            let generated_pubkey = read_pubkey(reader)?;
            let signer_index = reader.read_u32_be()?;
            let signature = read_signature(reader)?;
            Ok(SystemicTransaction::PublicKey(PublicKeyTransaction {
                generated_pubkey,
                signer_index,
                signature,
            }))
        }
        TAG_SPLIT_RANDOM => {
            let signer_index = reader.read_u32_be()?;
            let signature = read_signature(reader)?;
            let count = reader.read_u32_be()?;
            let mut pieces = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let present = reader.read_u8()?;
                if present == 0 {
                    pieces.push(None);
                } else {
                    pieces.push(Some(reader.read_lp_bytes()?));
                }
            }
            Ok(SystemicTransaction::SplitRandom(SplitRandomTransaction {
                pieces,
                signer_index,
                signature,
            }))
        }
        TAG_COMMIT_RANDOM => {
            let signer_index = reader.read_u32_be()?;
            let signature = read_signature(reader)?;
            let encrypted_random = reader.read_lp_bytes()?;
            Ok(SystemicTransaction::CommitRandom(CommitRandomTransaction {
                encrypted_random,
                signer_index,
                signature,
            }))
        }
        TAG_REVEAL_RANDOM => {
            let commit_hash: Hash = reader.read_fixed::<32>()?;
            let private_key = read_private_key(reader)?;
            Ok(SystemicTransaction::RevealRandom(RevealRandomTransaction {
                commit_hash,
                private_key,
            }))
        }
        TAG_PRIVATE_KEY => {
            let private_key = read_private_key(reader)?;
            Ok(SystemicTransaction::PrivateKey(PrivateKeyTransaction {
                private_key,
            }))
        }
        TAG_STAKE_HOLD => {
            let amount = reader.read_u64_be()?;
            let pubkey = read_pubkey(reader)?;
            let signature = read_signature(reader)?;
            Ok(SystemicTransaction::StakeHold(StakeHoldTransaction {
                amount,
                pubkey,
                signature,
            }))
        }
        TAG_STAKE_RELEASE => {
            let pubkey = read_pubkey(reader)?;
            let signature = read_signature(reader)?;
            Ok(SystemicTransaction::StakeRelease(StakeReleaseTransaction {
                pubkey,
                signature,
            }))
        }
        TAG_PENALTY => {
            let count = reader.read_u32_be()?;
            let mut conflicts = Vec::with_capacity(count as usize);
            for _ in 0..count {
                conflicts.push(reader.read_fixed::<32>()?);
            }
            let signature = read_signature(reader)?;
            Ok(SystemicTransaction::Penalty(PenaltyTransaction {
                conflicts,
                signature,
            }))
        }
        TAG_NEGATIVE_GOSSIP => {
            let pubkey = read_pubkey(reader)?;
            let timestamp = reader.read_u32_be()?;
            let block_number = reader.read_u32_be()?;
            let signature = read_signature(reader)?;
            Ok(SystemicTransaction::NegativeGossip(NegativeGossipTransaction {
                pubkey,
                timestamp,
                block_number,
                signature,
            }))
        }
        TAG_POSITIVE_GOSSIP => {
            let pubkey = read_pubkey(reader)?;
            let timestamp = reader.read_u32_be()?;
            let block_hash: Hash = reader.read_fixed::<32>()?;
            let signature = read_signature(reader)?;
            let signed_block = Box::new(block::parse_signed_block(reader)?);
            Ok(SystemicTransaction::PositiveGossip(PositiveGossipTransaction {
                pubkey,
                timestamp,
                block_hash,
                signed_block,
                signature,
            }))
        }
        TAG_PENALTY_GOSSIP => {
            let positive: Hash = reader.read_fixed::<32>()?;
            let negative: Hash = reader.read_fixed::<32>()?;
            let signature = read_signature(reader)?;
            Ok(SystemicTransaction::PenaltyGossip(PenaltyGossipTransaction {
                positive,
                negative,
                signature,
            }))
        }
        other => Err(CodecError::UnknownTag(other)),
    }
}

pub fn pack_payment(out: &mut Vec<u8>, tx: &PaymentTransaction) {
    out.extend_from_slice(&(tx.inputs.len() as u32).to_be_bytes());
    for input in &tx.inputs {
        out.extend_from_slice(&input.prev_tx_hash);
        out.extend_from_slice(&input.output_index.to_be_bytes());
    }
    out.extend_from_slice(&(tx.outputs.len() as u32).to_be_bytes());
    for output in &tx.outputs {
        out.extend_from_slice(&output.amount.to_be_bytes());
        out.extend_from_slice(&output.recipient);
    }
    out.extend_from_slice(tx.signature.as_bytes());
}

pub fn parse_payment(reader: &mut Reader<'_>) -> Result<PaymentTransaction, CodecError> {
    let count_in = reader.read_u32_be()?;
    let mut inputs = Vec::with_capacity(count_in as usize);
    for _ in 0..count_in {
        let prev_tx_hash: Hash = reader.read_fixed::<32>()?;
        let output_index = reader.read_u32_be()?;
        inputs.push(TxIn {
            prev_tx_hash,
            output_index,
        });
    }

    let count_out = reader.read_u32_be()?;
    let mut outputs = Vec::with_capacity(count_out as usize);
    for _ in 0..count_out {
        let amount = reader.read_u64_be()?;
        let recipient: Hash = reader.read_fixed::<32>()?;
        outputs.push(TxOut { amount, recipient });
    }

    let signature = read_signature(reader)?;
    Ok(PaymentTransaction {
        inputs,
        outputs,
        signature,
    })
}

/// Hashes `NegativeGossipTransaction`'s logical fields, excluding its
/// signature — this is what the author actually signs.
pub fn negative_gossip_signing_hash(t: &NegativeGossipTransaction) -> Hash {
    let mut buf = Vec::with_capacity(33 + 4 + 4);
    buf.extend_from_slice(t.pubkey.as_bytes());
    buf.extend_from_slice(&t.timestamp.to_be_bytes());
    buf.extend_from_slice(&t.block_number.to_be_bytes());
    sha256(&buf)
}

/// Hashes `PositiveGossipTransaction`'s logical fields (pubkey, timestamp,
/// block hash), excluding the signature and the nested signed block.
pub fn positive_gossip_signing_hash(t: &PositiveGossipTransaction) -> Hash {
    let mut buf = Vec::with_capacity(33 + 4 + 32);
    buf.extend_from_slice(t.pubkey.as_bytes());
    buf.extend_from_slice(&t.timestamp.to_be_bytes());
    buf.extend_from_slice(&t.block_hash);
    sha256(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeon_types::{Block, SignedBlock};

    fn sig(byte: u8) -> Signature {
        Signature::from_slice(&[byte; Signature::LEN]).unwrap()
    }

    fn pubkey(byte: u8) -> PublicKey {
        PublicKey::from_slice(&[byte; PublicKey::LEN]).unwrap()
    }

    fn round_trip(tx: SystemicTransaction) -> SystemicTransaction {
        let mut buf = Vec::new();
        pack_systemic(&mut buf, &tx);
        let mut reader = Reader::new(&buf);
        let parsed = parse_systemic(&mut reader).unwrap();
        assert_eq!(reader.remaining(), 0);
        parsed
    }

    #[test]
    fn public_key_tx_round_trips() {
        let tx = SystemicTransaction::PublicKey(PublicKeyTransaction {
            generated_pubkey: pubkey(1),
            signer_index: 3,
            signature: sig(2),
        });
        assert_eq!(round_trip(tx.clone()), tx);
    }

    #[test]
    fn split_random_with_missing_pieces_round_trips() {
        let tx = SystemicTransaction::SplitRandom(SplitRandomTransaction {
            pieces: vec![Some(vec![1, 2, 3]), None, Some(vec![])],
            signer_index: 0,
            signature: sig(9),
        });
        assert_eq!(round_trip(tx.clone()), tx);
    }

    #[test]
    fn commit_random_round_trips() {
        let tx = SystemicTransaction::CommitRandom(CommitRandomTransaction {
            encrypted_random: vec![9; 48],
            signer_index: 5,
            signature: sig(3),
        });
        assert_eq!(round_trip(tx.clone()), tx);
    }

    #[test]
    fn reveal_random_round_trips() {
        let tx = SystemicTransaction::RevealRandom(RevealRandomTransaction {
            commit_hash: [4u8; 32],
            private_key: PrivateKey::from_slice(&[5u8; PrivateKey::LEN]).unwrap(),
        });
        assert_eq!(round_trip(tx.clone()), tx);
    }

    #[test]
    fn penalty_round_trips() {
        let tx = SystemicTransaction::Penalty(PenaltyTransaction {
            conflicts: vec![[1u8; 32], [2u8; 32]],
            signature: sig(6),
        });
        assert_eq!(round_trip(tx.clone()), tx);
    }

    #[test]
    fn positive_gossip_with_nested_block_round_trips() {
        let signed_block = Box::new(SignedBlock {
            block: Block::genesis(100),
            signature: sig(1),
        });
        let tx = SystemicTransaction::PositiveGossip(PositiveGossipTransaction {
            pubkey: pubkey(2),
            timestamp: 100,
            block_hash: [3u8; 32],
            signed_block,
            signature: sig(4),
        });
        assert_eq!(round_trip(tx.clone()), tx);
    }

    #[test]
    fn gossip_signing_hash_ignores_signature() {
        let mut t = NegativeGossipTransaction {
            pubkey: pubkey(1),
            timestamp: 10,
            block_number: 2,
            signature: sig(1),
        };
        let h1 = negative_gossip_signing_hash(&t);
        t.signature = sig(2);
        let h2 = negative_gossip_signing_hash(&t);
        assert_eq!(h1, h2);
    }

    #[test]
    fn unknown_tag_errors() {
        let mut reader = Reader::new(&[255]);
        assert!(matches!(
            parse_systemic(&mut reader),
            Err(CodecError::UnknownTag(255))
        ));
    }

    #[test]
    fn payment_tx_round_trips() {
        let tx = PaymentTransaction {
            inputs: vec![TxIn {
                prev_tx_hash: [1u8; 32],
                output_index: 0,
            }],
            outputs: vec![TxOut {
                amount: 42,
                recipient: [2u8; 32],
            }],
            signature: sig(7),
        };
        let mut buf = Vec::new();
        pack_payment(&mut buf, &tx);
        let mut reader = Reader::new(&buf);
        let parsed = parse_payment(&mut reader).unwrap();
        assert_eq!(parsed, tx);
        assert_eq!(reader.remaining(), 0);
    }
}
