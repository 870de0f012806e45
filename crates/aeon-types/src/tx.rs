//! Systemic and payment transaction bodies (spec §3).
//!
//! Systemic transactions are modeled as a tagged sum rather than a trait
//! object hierarchy: the various `isinstance` checks of the reference
//! implementation collapse to a `match` on `SystemicTransaction`, and the
//! wire tag byte in `aeon-codec` is simply `std::mem::discriminant`-stable
//! ordering of this enum.

use sha2::{Digest, Sha256};

use crate::ids::{Hash, PrivateKey, PublicKey, Signature};
use crate::round::Round;

/// Local SHA-256 helper so every `*_hash`/`*_payload` method in this module
/// shares one way of turning a buffer into a 32-byte digest.
fn digest(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&out);
    buf
}

/// Declares the ephemeral public key a validator will use this era to
/// receive secret-share pieces. Published in the PUBLIC round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyTransaction {
    pub generated_pubkey: PublicKey,
    pub signer_index: u32,
    pub signature: Signature,
}

impl PublicKeyTransaction {
    /// Bytes this transaction's author signs: the ephemeral public key
    /// being declared, bound to the declaring signer's index.
    pub fn signing_hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(33 + 4);
        buf.extend_from_slice(self.generated_pubkey.as_bytes());
        buf.extend_from_slice(&self.signer_index.to_be_bytes());
        digest(&buf)
    }
}

/// One validator's Shamir-style share of a fresh 32-byte secret, encrypted
/// per-recipient under that recipient's ephemeral public key. Published in
/// the SECRETSHARE round. `k = floor(n/2) + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRandomTransaction {
    /// `pieces[i]` is the encrypted share meant for the i-th validator, or
    /// `None` if that validator never published an ephemeral public key to
    /// encrypt it under.
    pub pieces: Vec<Option<Vec<u8>>>,
    pub signer_index: u32,
    pub signature: Signature,
}

impl SplitRandomTransaction {
    /// Bytes the dealer signs: its index plus every piece, present or not,
    /// in order — so tampering with any one recipient's share, or with
    /// which recipients were skipped, invalidates the signature.
    pub fn signing_hash(&self) -> Hash {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.signer_index.to_be_bytes());
        for piece in &self.pieces {
            match piece {
                Some(bytes) => {
                    buf.push(1);
                    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                    buf.extend_from_slice(bytes);
                }
                None => buf.push(0),
            }
        }
        digest(&buf)
    }
}

/// Encrypts 32 random bytes under a fresh, ad hoc keypair the signer keeps
/// private until REVEAL. Published in the COMMIT round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRandomTransaction {
    pub encrypted_random: Vec<u8>,
    pub signer_index: u32,
    pub signature: Signature,
}

impl CommitRandomTransaction {
    /// The bytes a signer actually signs: the ciphertext and signer index,
    /// bound to the epoch hash the commit belongs to so a commit from one
    /// era can't be replayed as valid in another.
    pub fn signing_payload(&self, epoch_hash: &Hash) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encrypted_random.len() + 4 + 32);
        buf.extend_from_slice(&self.encrypted_random);
        buf.extend_from_slice(&self.signer_index.to_be_bytes());
        buf.extend_from_slice(epoch_hash);
        buf
    }

    /// Hash a matching `RevealRandomTransaction::commit_hash` must equal:
    /// the commit's signed fields plus the signature itself, so a reveal
    /// binds to one specific signed commit rather than just its logical
    /// content.
    pub fn reference_hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(&self.encrypted_random);
        hasher.update(self.signer_index.to_be_bytes());
        hasher.update(self.signature.as_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }
}

/// Discloses the private key that decrypts a matching commit. Published in
/// the REVEAL round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealRandomTransaction {
    pub commit_hash: Hash,
    pub private_key: PrivateKey,
}

/// Discloses the ephemeral private key matching an earlier
/// `PublicKeyTransaction`, published in the PRIVATE round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKeyTransaction {
    pub private_key: PrivateKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeHoldTransaction {
    pub amount: u64,
    pub pubkey: PublicKey,
    pub signature: Signature,
}

impl StakeHoldTransaction {
    pub fn signing_hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(8 + 33);
        buf.extend_from_slice(&self.amount.to_be_bytes());
        buf.extend_from_slice(self.pubkey.as_bytes());
        digest(&buf)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeReleaseTransaction {
    pub pubkey: PublicKey,
    pub signature: Signature,
}

impl StakeReleaseTransaction {
    pub fn signing_hash(&self) -> Hash {
        digest(self.pubkey.as_bytes())
    }
}

/// Cites a set of conflicting block hashes signed by the same validator in
/// the same epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenaltyTransaction {
    pub conflicts: Vec<Hash>,
    pub signature: Signature,
}

impl PenaltyTransaction {
    pub fn signing_hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(self.conflicts.len() * 32);
        for conflict in &self.conflicts {
            buf.extend_from_slice(conflict);
        }
        digest(&buf)
    }
}

/// "I have not seen a block for this timeslot."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegativeGossipTransaction {
    pub pubkey: PublicKey,
    pub timestamp: u32,
    pub block_number: u32,
    pub signature: Signature,
}

/// "Here is the hash I have for that timeslot."
///
/// Carries the nested `SignedBlock` itself (spec §6: "a `PositiveGossipTransaction`
/// payload ends with a nested `SignedBlock` pack"), so a single message both
/// answers a negative-gossip request and supplies the data needed to insert
/// the block, without a second round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositiveGossipTransaction {
    pub pubkey: PublicKey,
    pub timestamp: u32,
    pub block_hash: Hash,
    pub signed_block: Box<crate::block::SignedBlock>,
    pub signature: Signature,
}

/// Cites a pair `(positive, negative)` by the same author contradicting
/// each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenaltyGossipTransaction {
    pub positive: Hash,
    pub negative: Hash,
    pub signature: Signature,
}

impl PenaltyGossipTransaction {
    pub fn signing_hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&self.positive);
        buf.extend_from_slice(&self.negative);
        digest(&buf)
    }
}

/// The tagged sum of every consensus-protocol transaction kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemicTransaction {
    PublicKey(PublicKeyTransaction),
    SplitRandom(SplitRandomTransaction),
    CommitRandom(CommitRandomTransaction),
    RevealRandom(RevealRandomTransaction),
    PrivateKey(PrivateKeyTransaction),
    StakeHold(StakeHoldTransaction),
    StakeRelease(StakeReleaseTransaction),
    Penalty(PenaltyTransaction),
    NegativeGossip(NegativeGossipTransaction),
    PositiveGossip(PositiveGossipTransaction),
    PenaltyGossip(PenaltyGossipTransaction),
}

impl SystemicTransaction {
    /// The round in which this transaction kind is valid for in-block
    /// inclusion (spec §4.5/§4.6). Gossip transactions ride along in
    /// whichever round the signer happens to be producing a block in, so
    /// they report `None` here and are accepted separately.
    pub fn legal_round(&self) -> Option<Round> {
        match self {
            Self::PublicKey(_) => Some(Round::Public),
            Self::SplitRandom(_) => Some(Round::SecretShare),
            Self::CommitRandom(_) => Some(Round::Commit),
            Self::RevealRandom(_) => Some(Round::Reveal),
            Self::PrivateKey(_) => Some(Round::Private),
            Self::Penalty(_) => Some(Round::Private),
            Self::StakeHold(_) | Self::StakeRelease(_) => None,
            Self::NegativeGossip(_) | Self::PositiveGossip(_) | Self::PenaltyGossip(_) => None,
        }
    }

    /// `true` for the four kinds the mempool rate-limits to one-per-signer-
    /// per-era (spec testable property 3).
    pub fn is_rate_limited_per_era(&self) -> bool {
        matches!(
            self,
            Self::PublicKey(_) | Self::CommitRandom(_) | Self::SplitRandom(_) | Self::PrivateKey(_)
        )
    }
}

/// A single UTXO reference consumed by a payment transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    pub prev_tx_hash: Hash,
    pub output_index: u32,
}

/// A single new UTXO produced by a payment transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    pub amount: u64,
    pub recipient: Hash,
}

/// Consumes zero or more UTXOs and produces one or more new ones. Full
/// wallet/UTXO bookkeeping is out of scope (spec §1); this struct carries
/// just enough shape for mempool admission and block assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTransaction {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub signature: Signature,
}
