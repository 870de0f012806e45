//! Fixed-width identifiers shared by every wire structure.
//!
//! Widths follow the reference values from the wire-format section of the
//! specification: 32-byte SHA-256 hashes, 33-byte compressed secp256k1
//! public keys, 64-byte compact ECDSA signatures. A deployment is free to
//! choose different consistent widths; this crate just needs one fixed
//! choice that producer and consumer agree on.

use std::fmt;

/// Width, in bytes, of a block or transaction hash.
pub const HASH_LEN: usize = 32;
/// Width, in bytes, of a compressed public key.
pub const PUBKEY_LEN: usize = 33;
/// Width, in bytes, of a compact signature.
pub const SIGNATURE_LEN: usize = 64;
/// Width, in bytes, of a raw private scalar.
pub const PRIVKEY_LEN: usize = 32;

/// A SHA-256 digest, used as the content address of blocks and transactions.
pub type Hash = [u8; HASH_LEN];

macro_rules! fixed_bytes {
    ($name:ident, $len:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                if bytes.len() != $len {
                    return None;
                }
                let mut buf = [0u8; $len];
                buf.copy_from_slice(bytes);
                Some(Self(buf))
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }
    };
}

fixed_bytes!(PublicKey, PUBKEY_LEN);
fixed_bytes!(Signature, SIGNATURE_LEN);
fixed_bytes!(PrivateKey, PRIVKEY_LEN);
