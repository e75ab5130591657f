//! BLAKE3 content identifiers.
//!
//! - `object_id = BLAKE3(canonical_bytes)`
//! - `block_id  = BLAKE3(raw_block_bytes)`
//!
//! No prefix, salt or domain separator is mixed in. The two identifiers are
//! separate types so an object id can never stand in for a block id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::encoder::encode;
use crate::value::CanonicalValue;

/// Length of a BLAKE3 digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Error returned when parsing a hex identifier.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DigestError {
    /// Wrong number of hex characters.
    #[error("digest must be {expected} hex characters, got {actual}")]
    InvalidLength {
        /// Expected character count.
        expected: usize,
        /// Actual character count.
        actual: usize,
    },
    /// Not hex.
    #[error("invalid hex digest: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

macro_rules! content_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; DIGEST_LEN]);

        impl $name {
            /// Wraps raw digest bytes.
            pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
                Self(bytes)
            }

            /// Raw digest bytes.
            pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
                &self.0
            }

            /// Lowercase hex rendering.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parses a 64-character hex string (either case).
            pub fn from_hex(s: &str) -> Result<Self, DigestError> {
                if s.len() != DIGEST_LEN * 2 {
                    return Err(DigestError::InvalidLength {
                        expected: DIGEST_LEN * 2,
                        actual: s.len(),
                    });
                }
                let mut bytes = [0u8; DIGEST_LEN];
                hex::decode_to_slice(s, &mut bytes)?;
                Ok(Self(bytes))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = DigestError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

content_id!(ObjectId, "Identifier of an object: BLAKE3 of its canonical bytes.");
content_id!(BlockId, "Identifier of a block: BLAKE3 of its raw bytes.");

/// Computes the object id of canonical bytes.
///
/// The caller is responsible for passing canonical bytes; use
/// [`ObjectId::of_value`] to encode and hash in one step.
pub fn object_id(canonical_bytes: &[u8]) -> ObjectId {
    ObjectId(*blake3::hash(canonical_bytes).as_bytes())
}

/// Computes the block id of raw, uninterpreted bytes.
pub fn block_id(raw_bytes: &[u8]) -> BlockId {
    BlockId(*blake3::hash(raw_bytes).as_bytes())
}

impl ObjectId {
    /// Encodes `value` canonically and hashes the result.
    pub fn of_value(value: &CanonicalValue) -> Self {
        object_id(&encode(value))
    }
}

/// Recomputes the id of `canonical_bytes` and compares it with a stored one.
///
/// A stored id is never ground truth; `false` here means the bytes or the
/// stored id are corrupt.
pub fn verify_object_id(canonical_bytes: &[u8], claimed: &ObjectId) -> bool {
    let computed = object_id(canonical_bytes);
    if computed != *claimed {
        tracing::debug!(%claimed, %computed, "object id mismatch");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: &str = "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262";
    const ABC: &str = "6437b3ac38465133ffb63b75273a8db548c558465d79db03fd359c6cd5bd9d85";
    const ZEROS_1024: &str = "d6fd9de5bccf223f523b316c9cd1cf9a9d87ea42473d68e011dad13f09bf8917";

    #[test]
    fn pinned_block_digests() {
        assert_eq!(block_id(b"").to_hex(), EMPTY);
        assert_eq!(block_id(b"abc").to_hex(), ABC);
        assert_eq!(block_id(&[0u8; 1024]).to_hex(), ZEROS_1024);
    }

    #[test]
    fn object_and_block_ids_hash_the_same_bytes_identically() {
        assert_eq!(object_id(b"abc").as_bytes(), block_id(b"abc").as_bytes());
    }

    #[test]
    fn every_single_bit_flip_changes_the_digest() {
        let bytes = hex::decode("a2616100616201").unwrap();
        let original = object_id(&bytes);
        for index in 0..bytes.len() {
            for bit in 0..8 {
                let mut flipped = bytes.clone();
                flipped[index] ^= 1 << bit;
                assert_ne!(object_id(&flipped), original, "byte {index} bit {bit}");
            }
        }
    }

    #[test]
    fn hex_parsing() {
        let id = ObjectId::from_hex(EMPTY).unwrap();
        assert_eq!(id.to_string(), EMPTY);
        assert_eq!(ObjectId::from_hex(&EMPTY.to_uppercase()).unwrap(), id);
        assert_eq!(
            ObjectId::from_hex("abcd").unwrap_err(),
            DigestError::InvalidLength { expected: 64, actual: 4 }
        );
        assert!(matches!(
            BlockId::from_hex(&"zz".repeat(32)),
            Err(DigestError::InvalidHex(_))
        ));
    }

    #[test]
    fn serializes_as_hex_string() {
        let id = block_id(b"abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{ABC}\""));
        let back: BlockId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn verify_detects_corruption() {
        let bytes = hex::decode("a2616100616201").unwrap();
        let id = object_id(&bytes);
        assert!(verify_object_id(&bytes, &id));
        assert!(!verify_object_id(&bytes[..6], &id));
    }
}
