use keystone_canonical::{ProfileError, Rejection};
use thiserror::Error;

use crate::signing::PublicKey;

/// Errors that can occur while signing or verifying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// The signature does not verify over the given bytes and key.
    #[error("signature verification failed")]
    InvalidSignature,
    /// A detached signature names a different key than the one supplied.
    #[error("signature key mismatch: expected {expected}, got {actual}")]
    KeyMismatch {
        /// Key the caller expected.
        expected: PublicKey,
        /// Key recorded in the signature.
        actual: PublicKey,
    },
    /// Key bytes are the wrong length, not hex, or not a valid curve point.
    #[error("malformed key: {0}")]
    MalformedKey(String),
}

/// Errors that can occur while building or reading a signed object.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// A required field is absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// A field has the wrong type or an unacceptable value.
    #[error("invalid field value: {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
    /// The object names a protocol version this build cannot read.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(#[from] ProfileError),
    /// The payload is encrypted or otherwise not canonical CBOR.
    #[error("unsupported payload encoding: {0}")]
    UnsupportedPayloadEncoding(String),
    /// The object or payload bytes are not canonical.
    #[error("non-canonical bytes: {0}")]
    Rejected(#[from] Rejection),
    /// Signature check failed.
    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),
}
