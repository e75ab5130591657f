//! The signed object envelope.
//!
//! A signed object is a canonical map with these fields:
//! - `protocol_version`: integer
//! - `object_type`: text
//! - `space_id`: optional text
//! - `channel_id`: optional text
//! - `author_public_key`: bytes (32, Ed25519)
//! - `created_at`: optional integer, informational only
//! - `references`: array of bytes (32-byte object ids)
//! - `payload_schema_version`: integer
//! - `payload_encoding`: text
//! - `payload`: bytes
//! - `signature`: bytes (64, Ed25519)
//!
//! The signature covers the canonical bytes of the same map with `signature`
//! set to 64 zero bytes. The `object_id` covers the complete map, signature
//! included.

use keystone_canonical::{
    encode, object_id, CanonicalMap, CanonicalValue, Codec, ObjectId, Profile,
    CURRENT_PROTOCOL_VERSION,
};

use crate::errors::EnvelopeError;
use crate::signing::{check, sign, PublicKey, SecretKey, SIGNATURE_LEN};

/// Payload encoding: plaintext canonical CBOR.
pub const PAYLOAD_ENCODING_CANONICAL: &str = "cbor_canonical_v1";

/// Payload encoding: ciphertext produced outside this crate.
pub const PAYLOAD_ENCODING_ENCRYPTED: &str = "xchacha20poly1305_v1";

const FIELDS: &[&str] = &[
    "author_public_key",
    "channel_id",
    "created_at",
    "object_type",
    "payload",
    "payload_encoding",
    "payload_schema_version",
    "protocol_version",
    "references",
    "signature",
    "space_id",
];

/// A signed, immutable object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedObject {
    /// Protocol version the object was encoded under.
    pub protocol_version: u64,
    /// Application-defined type, e.g. `note` or `thread_create`.
    pub object_type: String,
    /// Space the object belongs to.
    pub space_id: Option<String>,
    /// Channel within the space.
    pub channel_id: Option<String>,
    /// Author's public key.
    pub author: PublicKey,
    /// Informational timestamp, not trusted for ordering.
    pub created_at: Option<u64>,
    /// Objects this one refers to.
    pub references: Vec<ObjectId>,
    /// Schema version of the payload.
    pub payload_schema_version: u64,
    /// How `payload` is encoded.
    pub payload_encoding: String,
    /// Payload bytes, canonical CBOR or ciphertext.
    pub payload: Vec<u8>,
    /// Ed25519 signature over the signable bytes.
    pub signature: [u8; SIGNATURE_LEN],
}

impl SignedObject {
    /// The object as a canonical value.
    pub fn to_value(&self) -> CanonicalValue {
        self.value_with_signature(&self.signature)
    }

    fn value_with_signature(&self, signature: &[u8; SIGNATURE_LEN]) -> CanonicalValue {
        let mut map = CanonicalMap::with_capacity(FIELDS.len());
        map.insert("protocol_version", CanonicalValue::UInt(self.protocol_version));
        map.insert("object_type", CanonicalValue::text(self.object_type.as_str()));
        if let Some(space) = &self.space_id {
            map.insert("space_id", CanonicalValue::text(space.as_str()));
        }
        if let Some(channel) = &self.channel_id {
            map.insert("channel_id", CanonicalValue::text(channel.as_str()));
        }
        map.insert("author_public_key", CanonicalValue::bytes(self.author.as_bytes().to_vec()));
        if let Some(ts) = self.created_at {
            map.insert("created_at", CanonicalValue::UInt(ts));
        }
        map.insert(
            "references",
            CanonicalValue::Array(
                self.references
                    .iter()
                    .map(|id| CanonicalValue::bytes(id.as_bytes().to_vec()))
                    .collect(),
            ),
        );
        map.insert(
            "payload_schema_version",
            CanonicalValue::UInt(self.payload_schema_version),
        );
        map.insert("payload_encoding", CanonicalValue::text(self.payload_encoding.as_str()));
        map.insert("payload", CanonicalValue::bytes(self.payload.clone()));
        map.insert("signature", CanonicalValue::bytes(signature.to_vec()));
        CanonicalValue::Map(map)
    }

    /// Canonical bytes of the complete object. These define the object id.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        encode(&self.to_value())
    }

    /// The bytes the author signs: the object with a zeroed signature field.
    pub fn signable_bytes(&self) -> Vec<u8> {
        encode(&self.value_with_signature(&[0u8; SIGNATURE_LEN]))
    }

    /// BLAKE3 of the canonical bytes.
    pub fn object_id(&self) -> ObjectId {
        object_id(&self.to_canonical_bytes())
    }

    /// Checks the signature against `author`.
    pub fn verify(&self) -> Result<(), EnvelopeError> {
        check(&self.signable_bytes(), &self.signature, &self.author)?;
        Ok(())
    }

    /// Decodes a payload carried as canonical CBOR.
    pub fn payload_value(&self, codec: &Codec) -> Result<CanonicalValue, EnvelopeError> {
        if self.payload_encoding != PAYLOAD_ENCODING_CANONICAL {
            return Err(EnvelopeError::UnsupportedPayloadEncoding(
                self.payload_encoding.clone(),
            ));
        }
        Ok(codec.decode(&self.payload)?)
    }

    /// Reads an object from strictly decoded canonical bytes.
    ///
    /// The codec's profile governs decoding; the object's own
    /// `protocol_version` must also be one this build supports.
    pub fn from_canonical_bytes(bytes: &[u8], codec: &Codec) -> Result<Self, EnvelopeError> {
        let value = codec.decode(bytes)?;
        Self::from_value(&value)
    }

    /// Reads an object from a decoded value.
    pub fn from_value(value: &CanonicalValue) -> Result<Self, EnvelopeError> {
        let map = value.as_map().ok_or_else(|| EnvelopeError::InvalidField {
            field: "root".to_string(),
            reason: format!("expected map, got {}", value.kind()),
        })?;
        for (key, _) in map.iter() {
            match key.as_text() {
                Some(name) if FIELDS.contains(&name) => {}
                _ => {
                    return Err(EnvelopeError::InvalidField {
                        field: format!("{:?}", key),
                        reason: "unknown field".to_string(),
                    })
                }
            }
        }

        let protocol_version = required_uint(map, "protocol_version")?;
        Profile::for_version(protocol_version)?;

        let author_bytes = required_bytes(map, "author_public_key")?;
        let author = PublicKey::from_slice(author_bytes).map_err(|err| invalid("author_public_key", err))?;

        let signature: [u8; SIGNATURE_LEN] = required_bytes(map, "signature")?
            .try_into()
            .map_err(|_| invalid("signature", format!("expected {} bytes", SIGNATURE_LEN)))?;

        let references = match map.get_text("references") {
            None => return Err(EnvelopeError::MissingField("references")),
            Some(value) => value
                .as_array()
                .ok_or_else(|| invalid("references", "expected array"))?
                .iter()
                .map(|item| {
                    let bytes: [u8; 32] = item
                        .as_bytes()
                        .and_then(|b| b.try_into().ok())
                        .ok_or_else(|| invalid("references", "expected 32-byte object ids"))?;
                    Ok(ObjectId::from_bytes(bytes))
                })
                .collect::<Result<Vec<_>, EnvelopeError>>()?,
        };

        Ok(Self {
            protocol_version,
            object_type: required_text(map, "object_type")?.to_string(),
            space_id: optional_text(map, "space_id")?,
            channel_id: optional_text(map, "channel_id")?,
            author,
            created_at: optional_uint(map, "created_at")?,
            references,
            payload_schema_version: required_uint(map, "payload_schema_version")?,
            payload_encoding: required_text(map, "payload_encoding")?.to_string(),
            payload: required_bytes(map, "payload")?.to_vec(),
            signature,
        })
    }
}

fn invalid(field: &str, reason: impl ToString) -> EnvelopeError {
    EnvelopeError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn required<'a>(map: &'a CanonicalMap, field: &'static str) -> Result<&'a CanonicalValue, EnvelopeError> {
    map.get_text(field).ok_or(EnvelopeError::MissingField(field))
}

fn required_uint(map: &CanonicalMap, field: &'static str) -> Result<u64, EnvelopeError> {
    required(map, field)?
        .as_u64()
        .ok_or_else(|| invalid(field, "expected unsigned integer"))
}

fn required_text<'a>(map: &'a CanonicalMap, field: &'static str) -> Result<&'a str, EnvelopeError> {
    required(map, field)?
        .as_text()
        .ok_or_else(|| invalid(field, "expected text"))
}

fn required_bytes<'a>(map: &'a CanonicalMap, field: &'static str) -> Result<&'a [u8], EnvelopeError> {
    required(map, field)?
        .as_bytes()
        .ok_or_else(|| invalid(field, "expected bytes"))
}

fn optional_text(map: &CanonicalMap, field: &'static str) -> Result<Option<String>, EnvelopeError> {
    map.get_text(field)
        .map(|v| {
            v.as_text()
                .map(str::to_string)
                .ok_or_else(|| invalid(field, "expected text"))
        })
        .transpose()
}

fn optional_uint(map: &CanonicalMap, field: &'static str) -> Result<Option<u64>, EnvelopeError> {
    map.get_text(field)
        .map(|v| v.as_u64().ok_or_else(|| invalid(field, "expected unsigned integer")))
        .transpose()
}

/// Builder for creating and signing new objects.
#[derive(Debug, Clone)]
pub struct ObjectBuilder {
    object_type: String,
    space_id: Option<String>,
    channel_id: Option<String>,
    created_at: Option<u64>,
    references: Vec<ObjectId>,
    payload_schema_version: u64,
    payload_encoding: String,
    payload: Vec<u8>,
}

impl ObjectBuilder {
    /// Starts an object of the given type with an empty canonical payload.
    pub fn new(object_type: &str) -> Self {
        Self {
            object_type: object_type.to_string(),
            space_id: None,
            channel_id: None,
            created_at: None,
            references: Vec::new(),
            payload_schema_version: 1,
            payload_encoding: PAYLOAD_ENCODING_CANONICAL.to_string(),
            payload: Vec::new(),
        }
    }

    /// Sets the space id.
    pub fn space_id(mut self, id: &str) -> Self {
        self.space_id = Some(id.to_string());
        self
    }

    /// Sets the channel id.
    pub fn channel_id(mut self, id: &str) -> Self {
        self.channel_id = Some(id.to_string());
        self
    }

    /// Sets the informational timestamp.
    pub fn created_at(mut self, ts: u64) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Adds a reference to another object.
    pub fn reference(mut self, id: ObjectId) -> Self {
        self.references.push(id);
        self
    }

    /// Sets the payload schema version.
    pub fn payload_schema_version(mut self, version: u64) -> Self {
        self.payload_schema_version = version;
        self
    }

    /// Sets opaque payload bytes and their encoding label.
    pub fn payload_raw(mut self, encoding: &str, bytes: Vec<u8>) -> Self {
        self.payload_encoding = encoding.to_string();
        self.payload = bytes;
        self
    }

    /// Sets the payload to the canonical encoding of `value`.
    pub fn payload_value(mut self, value: &CanonicalValue) -> Self {
        self.payload_encoding = PAYLOAD_ENCODING_CANONICAL.to_string();
        self.payload = encode(value);
        self
    }

    /// Signs and builds the object under the current protocol version.
    pub fn sign(self, secret: &SecretKey) -> SignedObject {
        let mut object = SignedObject {
            protocol_version: CURRENT_PROTOCOL_VERSION,
            object_type: self.object_type,
            space_id: self.space_id,
            channel_id: self.channel_id,
            author: secret.public_key(),
            created_at: self.created_at,
            references: self.references,
            payload_schema_version: self.payload_schema_version,
            payload_encoding: self.payload_encoding,
            payload: self.payload,
            signature: [0u8; SIGNATURE_LEN],
        };
        object.signature = *sign(&object.signable_bytes(), secret).as_bytes();
        object
    }
}
