//! Signing and the signed object envelope for Keystone.
//!
//! This crate provides:
//! - Ed25519 signatures over canonical bytes, never over digests or descriptions
//! - Secret keys held in zeroizing storage and redacted from `Debug`
//! - A signed object envelope whose `object_id` covers the signature
//!
//! ```rust
//! use keystone_canonical::{Codec, Profile};
//! use keystone_core::{sign, verify, SecretKey};
//!
//! let codec = Codec::new(Profile::v1());
//! let out = codec.canonicalize_json(r#"{"type": "note", "version": 1}"#)?;
//!
//! let key = SecretKey::from_bytes([7u8; 32]);
//! let signature = sign(&out.bytes, &key);
//! assert!(verify(&out.bytes, signature.as_bytes(), &key.public_key()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]

/// Signed object envelope and builder.
pub mod envelope;
/// Error types for signing and envelope operations.
pub mod errors;
/// Ed25519 keys, signatures and verification.
pub mod signing;

pub use envelope::{
    ObjectBuilder, SignedObject, PAYLOAD_ENCODING_CANONICAL, PAYLOAD_ENCODING_ENCRYPTED,
};
pub use errors::{EnvelopeError, SignatureError};
pub use signing::{
    check, check_signature, sign, sign_value, verify, verify_value, PublicKey, SecretKey,
    Signature, PUBLIC_KEY_LEN, SECRET_KEY_LEN, SIGNATURE_LEN,
};
