use crate::decoder::{decode, Rejection};
use crate::digest::{object_id, ObjectId};
use crate::encoder::encode;
use crate::ingest::{from_json_str, IngestionError};
use crate::profile::{Profile, ProfileError};
use crate::value::CanonicalValue;

/// Error returned when canonicalization fails.
#[derive(thiserror::Error, Debug)]
pub enum CanonicalizationError {
    /// The description could not be ingested.
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    /// The encoded bytes do not pass the strict decoder of the active profile.
    #[error("canonical bytes rejected: {0}")]
    Rejected(#[from] Rejection),
}

/// Result of canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonicalized {
    /// The value that was encoded.
    pub value: CanonicalValue,
    /// Canonical bytes for the value.
    pub bytes: Vec<u8>,
    /// BLAKE3 of `bytes`.
    pub object_id: ObjectId,
}

/// Encoder and strict decoder bound to one protocol profile.
///
/// Holds no mutable state; share it freely across threads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Codec {
    profile: Profile,
}

impl Codec {
    /// Creates a codec for the provided profile.
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    /// Creates a codec for a protocol version.
    pub fn for_version(version: u64) -> Result<Self, ProfileError> {
        Ok(Self::new(Profile::for_version(version)?))
    }

    /// The profile this codec was built with.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Canonical bytes of `value`.
    pub fn encode(&self, value: &CanonicalValue) -> Vec<u8> {
        encode(value)
    }

    /// Strictly decodes canonical bytes under this codec's profile.
    pub fn decode(&self, bytes: &[u8]) -> Result<CanonicalValue, Rejection> {
        decode(bytes, &self.profile)
    }

    /// Object id of `value`.
    pub fn object_id(&self, value: &CanonicalValue) -> ObjectId {
        object_id(&encode(value))
    }

    /// Encodes `value` and checks the result against this profile's decoder.
    ///
    /// Fails only when `value` carries something the profile does not admit,
    /// such as a tag outside the allowlist or nesting beyond the depth limit.
    pub fn canonicalize(&self, value: &CanonicalValue) -> Result<Canonicalized, Rejection> {
        let bytes = encode(value);
        self.decode(&bytes)?;
        let object_id = object_id(&bytes);
        Ok(Canonicalized {
            value: value.clone(),
            bytes,
            object_id,
        })
    }

    /// Ingests JSON text and canonicalizes the result.
    pub fn canonicalize_json(&self, json: &str) -> Result<Canonicalized, CanonicalizationError> {
        let value = from_json_str(json)?;
        Ok(self.canonicalize(&value)?)
    }
}
