use std::collections::HashSet;

use keystone_canonical::{BlockId, ObjectId};
use keystone_core::PublicKey;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::errors::VectorError;
use crate::identifiers::VectorId;

/// Input of a conformance vector.
///
/// A JSON description is kept as raw text so duplicate members and number
/// spellings reach the ingestion adapter untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorInput {
    /// A structured description to ingest, encode, hash and optionally sign.
    Description(Box<RawValue>),
    /// Bytes to run through the strict decoder.
    CanonicalHex(String),
    /// Uninterpreted block bytes to hash.
    BlockHex(String),
}

impl VectorInput {
    /// Wraps JSON text. The text must be syntactically valid JSON.
    pub fn description(json: &str) -> Result<Self, VectorError> {
        Ok(Self::Description(RawValue::from_string(json.trim().to_string())?))
    }

    /// Decoder input from raw bytes.
    pub fn canonical_bytes(bytes: &[u8]) -> Self {
        Self::CanonicalHex(hex::encode(bytes))
    }

    /// Block input from raw bytes.
    pub fn block(bytes: &[u8]) -> Self {
        Self::BlockHex(hex::encode(bytes))
    }

    /// Short label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Description(_) => "description",
            Self::CanonicalHex(_) => "canonical_hex",
            Self::BlockHex(_) => "block_hex",
        }
    }
}

/// Published signature for an accepted vector.
///
/// Only published test keys ever appear here; the seed is part of the vector
/// so independent implementations can reproduce the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignatureExpectation {
    /// Public key of the test key.
    pub public_key: PublicKey,
    /// Ed25519 signature over the canonical bytes, hex.
    pub signature: String,
    /// Secret seed of the test key, hex.
    pub secret_seed: String,
}

/// Expected acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcceptExpectation {
    /// Canonical bytes, hex.
    pub canonical_hex: String,
    /// BLAKE3 of the canonical bytes.
    pub object_id: ObjectId,
    /// Signature made with a published test key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureExpectation>,
}

/// Expected rejection by the ingestion adapter or the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RejectExpectation {
    /// Snake_case reason code.
    pub reason: String,
    /// Field path, for ingestion rejections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Byte offset, for decoder rejections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

/// Expected block identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockExpectation {
    /// BLAKE3 of the raw block bytes.
    pub block_id: BlockId,
}

/// The outcome a vector pins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// The input is accepted.
    Accept(AcceptExpectation),
    /// The input is rejected.
    Reject(RejectExpectation),
    /// The input is a block with this id.
    Block(BlockExpectation),
}

impl Expectation {
    /// Short label for reports.
    pub fn verdict(&self) -> &'static str {
        match self {
            Self::Accept(_) => "ok",
            Self::Reject(_) => "rejected",
            Self::Block(_) => "block",
        }
    }
}

/// A single conformance vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConformanceVector {
    /// Stable identifier.
    pub id: VectorId,
    /// Protocol version the vector was published under.
    pub protocol_version: u64,
    /// Human-readable explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// What is fed to the implementation.
    pub input: VectorInput,
    /// What the implementation must produce.
    pub expect: Expectation,
    /// Vector that replaces this one under a later protocol version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<VectorId>,
}

/// A published collection of vectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VectorSet {
    /// Free-form description of the set.
    #[serde(default)]
    pub description: String,
    /// Vectors in publication order.
    pub vectors: Vec<ConformanceVector>,
}

impl VectorSet {
    /// Creates an empty set.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            vectors: Vec::new(),
        }
    }

    /// Looks up a vector by id.
    pub fn get(&self, id: &str) -> Option<&ConformanceVector> {
        self.vectors.iter().find(|v| v.id.as_str() == id)
    }

    /// Appends a vector whose id is not yet used.
    pub fn push(&mut self, vector: ConformanceVector) -> Result<(), VectorError> {
        if self.get(vector.id.as_str()).is_some() {
            return Err(VectorError::InvalidSet(format!("duplicate vector id {}", vector.id)));
        }
        self.vectors.push(vector);
        Ok(())
    }

    /// Publishes `replacement` and marks `old` as superseded by it.
    ///
    /// The old vector is kept; only its `superseded_by` link is set.
    pub fn supersede(&mut self, old: &VectorId, replacement: ConformanceVector) -> Result<(), VectorError> {
        let old_version = match self.get(old.as_str()) {
            Some(existing) if existing.superseded_by.is_some() => {
                return Err(VectorError::InvalidSet(format!("{} is already superseded", old)))
            }
            Some(existing) => existing.protocol_version,
            None => return Err(VectorError::InvalidSet(format!("unknown vector id {}", old))),
        };
        if replacement.protocol_version <= old_version {
            return Err(VectorError::InvalidSet(format!(
                "{} must use a protocol version above {}",
                replacement.id, old_version
            )));
        }
        let replacement_id = replacement.id.clone();
        self.push(replacement)?;
        if let Some(existing) = self.vectors.iter_mut().find(|v| &v.id == old) {
            existing.superseded_by = Some(replacement_id);
        }
        Ok(())
    }

    /// Checks id uniqueness and that every supersession points forward.
    pub fn validate(&self) -> Result<(), VectorError> {
        let mut seen = HashSet::with_capacity(self.vectors.len());
        for vector in &self.vectors {
            if !seen.insert(vector.id.as_str()) {
                return Err(VectorError::InvalidSet(format!("duplicate vector id {}", vector.id)));
            }
        }
        for vector in &self.vectors {
            if let Some(next) = &vector.superseded_by {
                match self.get(next.as_str()) {
                    Some(replacement) if replacement.protocol_version > vector.protocol_version => {}
                    Some(_) => {
                        return Err(VectorError::InvalidSet(format!(
                            "{} is superseded by {} under a protocol version that is not later",
                            vector.id, next
                        )))
                    }
                    None => {
                        return Err(VectorError::InvalidSet(format!(
                            "{} is superseded by unknown vector {}",
                            vector.id, next
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_vector(id: &str, version: u64) -> ConformanceVector {
        ConformanceVector {
            id: VectorId::parse(id).unwrap(),
            protocol_version: version,
            note: None,
            input: VectorInput::block(b"abc"),
            expect: Expectation::Block(BlockExpectation {
                block_id: keystone_canonical::block_id(b"abc"),
            }),
            superseded_by: None,
        }
    }

    #[test]
    fn description_input_keeps_raw_text() {
        let input = VectorInput::description(r#" {"a": 1, "a": 2} "#).unwrap();
        match &input {
            VectorInput::Description(raw) => assert_eq!(raw.get(), r#"{"a": 1, "a": 2}"#),
            other => panic!("unexpected input {:?}", other),
        }
        let json = serde_json::to_string(&input).unwrap();
        assert_eq!(json, r#"{"description":{"a": 1, "a": 2}}"#);
        assert!(VectorInput::description("{").is_err());
    }

    #[test]
    fn expectation_shapes() {
        let reject: Expectation =
            serde_json::from_str(r#"{"reject": {"reason": "indefinite_length", "offset": 0}}"#).unwrap();
        assert_eq!(
            reject,
            Expectation::Reject(RejectExpectation {
                reason: "indefinite_length".into(),
                path: None,
                offset: Some(0),
            })
        );
        assert!(serde_json::from_str::<Expectation>(r#"{"reject": {"reason": "x", "extra": 1}}"#).is_err());
    }

    #[test]
    fn supersede_keeps_the_old_vector() {
        let mut set = VectorSet::new("test");
        set.push(block_vector("block-abc", 1)).unwrap();
        set.supersede(&VectorId::parse("block-abc").unwrap(), block_vector("block-abc-v2", 2))
            .unwrap();
        assert_eq!(set.vectors.len(), 2);
        assert_eq!(
            set.get("block-abc").unwrap().superseded_by.as_ref().map(VectorId::as_str),
            Some("block-abc-v2")
        );
        set.validate().unwrap();
    }

    #[test]
    fn supersede_must_move_forward() {
        let mut set = VectorSet::new("test");
        set.push(block_vector("block-abc", 1)).unwrap();
        let old = VectorId::parse("block-abc").unwrap();
        assert!(set.supersede(&old, block_vector("block-abc-again", 1)).is_err());
        assert!(set.push(block_vector("block-abc", 2)).is_err());
        assert_eq!(set.vectors.len(), 1);
    }

    #[test]
    fn validate_catches_dangling_links() {
        let mut set = VectorSet::new("test");
        let mut vector = block_vector("block-abc", 1);
        vector.superseded_by = Some(VectorId::parse("missing-vector").unwrap());
        set.vectors.push(vector);
        assert!(matches!(set.validate(), Err(VectorError::InvalidSet(_))));
    }
}
