//! Canonical data model primitives for Keystone objects.
//!
//! Everything that participates in hashing or signing lives in this crate:
//! the closed [`CanonicalValue`] model, the canonical CBOR encoder, the strict
//! validating decoder, the JSON ingestion adapter and the BLAKE3 content
//! identifiers (`object_id`, `block_id`).
//!
//! The active rule set is an explicit [`Profile`] bound into a [`Codec`] at
//! construction; nothing here reads global state.
//!
//! ```rust
//! use keystone_canonical::{Codec, Profile};
//!
//! let codec = Codec::new(Profile::v1());
//! let out = codec.canonicalize_json(r#"{"b": 1, "a": 0}"#)?;
//! assert_eq!(hex::encode(&out.bytes), "a2616100616201");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![deny(missing_docs)]

/// Profile-bound encoder/decoder.
pub mod codec;
/// Strict validating decoder and rejection reasons.
pub mod decoder;
/// BLAKE3 content identifiers.
pub mod digest;
/// Canonical CBOR encoder.
pub mod encoder;
/// Structured-description ingestion adapter.
pub mod ingest;
/// Protocol profiles (active rule sets).
pub mod profile;
/// Canonical value model.
pub mod value;

pub use codec::{Canonicalized, CanonicalizationError, Codec};
pub use decoder::{decode, Rejection, RejectionReason};
pub use digest::{block_id, object_id, verify_object_id, BlockId, DigestError, ObjectId, DIGEST_LEN};
pub use encoder::{encode, encode_into};
pub use ingest::{from_description, from_json_str, from_json_value, Description, IngestionError};
pub use profile::{
    KeyOrderPolicy, Profile, ProfileError, CURRENT_PROTOCOL_VERSION, PROTOCOL_V1,
    SUPPORTED_PROTOCOL_VERSIONS,
};
pub use value::{CanonicalMap, CanonicalValue, MapKey};
