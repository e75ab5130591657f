//! Generating vectors from inputs and checking published vectors.
//!
//! Checking re-derives the outcome from the vector's input with the given
//! codec, then compares it field by field with the published expectation.
//! The first divergence is reported precisely: the offset of the first
//! differing canonical byte, or which part of a rejection differed.

use keystone_canonical::{
    block_id, from_json_str, object_id, BlockId, Codec, IngestionError, ObjectId,
};
use keystone_core::{check, sign, SecretKey};
use serde::Serialize;
use thiserror::Error;

use crate::errors::VectorError;
use crate::identifiers::VectorId;
use crate::model::{
    AcceptExpectation, BlockExpectation, ConformanceVector, Expectation, RejectExpectation,
    SignatureExpectation, VectorInput, VectorSet,
};

/// How a vector failed to reproduce.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VectorMismatch {
    /// Canonical bytes differ.
    #[error("canonical bytes differ at byte offset {offset} (expected {expected_len} bytes, got {actual_len})")]
    CanonicalBytes {
        /// Offset of the first differing byte, or the shorter length.
        offset: usize,
        /// Expected byte length.
        expected_len: usize,
        /// Produced byte length.
        actual_len: usize,
    },
    /// Object ids differ although the bytes match.
    #[error("object_id differs: expected {expected}, got {actual}")]
    ObjectId {
        /// Published id.
        expected: ObjectId,
        /// Computed id.
        actual: ObjectId,
    },
    /// Block ids differ.
    #[error("block_id differs: expected {expected}, got {actual}")]
    BlockId {
        /// Published id.
        expected: BlockId,
        /// Computed id.
        actual: BlockId,
    },
    /// Signature or public key differs, or the published signature does not verify.
    #[error("signature mismatch: {detail}")]
    Signature {
        /// What differed.
        detail: String,
    },
    /// Both sides rejected, for different reasons.
    #[error("rejection reason differs: expected {expected}, got {actual}")]
    RejectionReason {
        /// Published reason.
        expected: String,
        /// Reported reason.
        actual: String,
    },
    /// Same reason, different byte offset.
    #[error("rejection offset differs: expected {expected:?}, got {actual:?}")]
    RejectionOffset {
        /// Published offset.
        expected: Option<usize>,
        /// Reported offset.
        actual: Option<usize>,
    },
    /// Same reason, different field path.
    #[error("rejection path differs: expected {expected:?}, got {actual:?}")]
    RejectionPath {
        /// Published path.
        expected: Option<String>,
        /// Reported path.
        actual: Option<String>,
    },
    /// The vector expects acceptance but the input was rejected.
    #[error("expected acceptance, input was rejected: {reason}")]
    UnexpectedRejection {
        /// Reported reason code.
        reason: String,
    },
    /// The vector expects rejection but the input was accepted.
    #[error("expected rejection ({expected}), input was accepted as {canonical_hex}")]
    UnexpectedAcceptance {
        /// Published reason code.
        expected: String,
        /// Produced canonical bytes, hex.
        canonical_hex: String,
    },
    /// The vector cannot be evaluated.
    #[error("malformed vector: {detail}")]
    MalformedVector {
        /// What is wrong with it.
        detail: String,
    },
}

/// Result of a successful check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorOutcome {
    /// Vector that was checked.
    pub id: VectorId,
    /// The outcome that was reproduced.
    pub actual: Expectation,
}

/// Result of checking a whole set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetReport {
    /// Vectors that reproduced.
    pub passed: Vec<VectorId>,
    /// Vectors published under another protocol version.
    pub skipped: Vec<VectorId>,
    /// Vectors that did not reproduce.
    pub failed: Vec<(VectorId, VectorMismatch)>,
}

impl SetReport {
    /// Whether every checked vector reproduced.
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Evaluates `input` and records the outcome as a new vector.
///
/// `secret_seed` is the hex seed of a published test key; when given and the
/// input is accepted, the signature is recorded alongside the seed.
pub fn generate_vector(
    id: VectorId,
    input: VectorInput,
    secret_seed: Option<&str>,
    codec: &Codec,
) -> Result<ConformanceVector, VectorError> {
    let expect = evaluate(&input, secret_seed, codec).map_err(VectorError::MalformedInput)?;
    tracing::debug!(%id, verdict = expect.verdict(), "generated vector");
    Ok(ConformanceVector {
        id,
        protocol_version: codec.profile().protocol_version,
        note: None,
        input,
        expect,
        superseded_by: None,
    })
}

/// Re-derives a vector's outcome and compares it with the published one.
pub fn check_vector(vector: &ConformanceVector, codec: &Codec) -> Result<VectorOutcome, VectorMismatch> {
    if vector.protocol_version != codec.profile().protocol_version {
        return Err(VectorMismatch::MalformedVector {
            detail: format!(
                "vector is for protocol version {}, codec is {}",
                vector.protocol_version,
                codec.profile().protocol_version
            ),
        });
    }
    let seed = match &vector.expect {
        Expectation::Accept(AcceptExpectation {
            signature: Some(sig), ..
        }) => Some(sig.secret_seed.as_str()),
        _ => None,
    };
    let actual = evaluate(&vector.input, seed, codec)
        .map_err(|detail| VectorMismatch::MalformedVector { detail })?;
    if let Err(mismatch) = compare(&vector.expect, &actual) {
        tracing::debug!(id = %vector.id, %mismatch, "vector mismatch");
        return Err(mismatch);
    }
    Ok(VectorOutcome {
        id: vector.id.clone(),
        actual,
    })
}

/// Checks every vector published under the codec's protocol version.
///
/// Superseded vectors are still checked: supersession never invalidates a
/// vector under the version it was published for.
pub fn check_set(set: &VectorSet, codec: &Codec) -> SetReport {
    let version = codec.profile().protocol_version;
    let mut report = SetReport::default();
    for vector in &set.vectors {
        if vector.protocol_version != version {
            report.skipped.push(vector.id.clone());
            continue;
        }
        match check_vector(vector, codec) {
            Ok(_) => report.passed.push(vector.id.clone()),
            Err(mismatch) => report.failed.push((vector.id.clone(), mismatch)),
        }
    }
    report
}

fn evaluate(input: &VectorInput, secret_seed: Option<&str>, codec: &Codec) -> Result<Expectation, String> {
    let bytes = match input {
        VectorInput::BlockHex(h) => {
            let raw = hex::decode(h.trim()).map_err(|err| format!("block_hex: {}", err))?;
            return Ok(Expectation::Block(BlockExpectation {
                block_id: block_id(&raw),
            }));
        }
        VectorInput::Description(raw) => {
            let value = match from_json_str(raw.get()) {
                Ok(value) => value,
                Err(IngestionError::Parse(err)) => return Err(format!("description: {}", err)),
                Err(err) => {
                    return Ok(Expectation::Reject(RejectExpectation {
                        reason: err.code().to_string(),
                        path: err.path().map(str::to_string),
                        offset: None,
                    }))
                }
            };
            match codec.canonicalize(&value) {
                Ok(out) => out.bytes,
                Err(rejection) => return Ok(decoder_rejection(rejection)),
            }
        }
        VectorInput::CanonicalHex(h) => {
            let raw = hex::decode(h.trim()).map_err(|err| format!("canonical_hex: {}", err))?;
            if let Err(rejection) = codec.decode(&raw) {
                return Ok(decoder_rejection(rejection));
            }
            raw
        }
    };

    let signature = match secret_seed {
        None => None,
        Some(seed) => {
            let secret = SecretKey::from_hex(seed).map_err(|err| format!("secret_seed: {}", err))?;
            let sig = sign(&bytes, &secret);
            Some(SignatureExpectation {
                public_key: *sig.key_id(),
                signature: sig.to_hex(),
                secret_seed: seed.trim().to_lowercase(),
            })
        }
    };

    Ok(Expectation::Accept(AcceptExpectation {
        canonical_hex: hex::encode(&bytes),
        object_id: object_id(&bytes),
        signature,
    }))
}

fn decoder_rejection(rejection: keystone_canonical::Rejection) -> Expectation {
    Expectation::Reject(RejectExpectation {
        reason: rejection.reason.code().to_string(),
        path: None,
        offset: Some(rejection.offset),
    })
}

fn compare(expected: &Expectation, actual: &Expectation) -> Result<(), VectorMismatch> {
    match (expected, actual) {
        (Expectation::Accept(exp), Expectation::Accept(act)) => compare_accept(exp, act),
        (Expectation::Reject(exp), Expectation::Reject(act)) => {
            if exp.reason != act.reason {
                return Err(VectorMismatch::RejectionReason {
                    expected: exp.reason.clone(),
                    actual: act.reason.clone(),
                });
            }
            if exp.offset.is_some() && exp.offset != act.offset {
                return Err(VectorMismatch::RejectionOffset {
                    expected: exp.offset,
                    actual: act.offset,
                });
            }
            if exp.path.is_some() && exp.path != act.path {
                return Err(VectorMismatch::RejectionPath {
                    expected: exp.path.clone(),
                    actual: act.path.clone(),
                });
            }
            Ok(())
        }
        (Expectation::Block(exp), Expectation::Block(act)) => {
            if exp.block_id != act.block_id {
                return Err(VectorMismatch::BlockId {
                    expected: exp.block_id,
                    actual: act.block_id,
                });
            }
            Ok(())
        }
        (Expectation::Accept(_), Expectation::Reject(act)) => Err(VectorMismatch::UnexpectedRejection {
            reason: match (&act.path, act.offset) {
                (Some(path), _) => format!("{} at {}", act.reason, path),
                (None, Some(offset)) => format!("{} at byte offset {}", act.reason, offset),
                (None, None) => act.reason.clone(),
            },
        }),
        (Expectation::Reject(exp), Expectation::Accept(act)) => Err(VectorMismatch::UnexpectedAcceptance {
            expected: exp.reason.clone(),
            canonical_hex: act.canonical_hex.clone(),
        }),
        (exp, act) => Err(VectorMismatch::MalformedVector {
            detail: format!(
                "input yields a {} outcome but the vector expects {}",
                act.verdict(),
                exp.verdict()
            ),
        }),
    }
}

fn compare_accept(expected: &AcceptExpectation, actual: &AcceptExpectation) -> Result<(), VectorMismatch> {
    let expected_bytes = hex::decode(expected.canonical_hex.trim())
        .map_err(|err| VectorMismatch::MalformedVector {
            detail: format!("expected canonical_hex: {}", err),
        })?;
    let actual_bytes = hex::decode(&actual.canonical_hex)
        .map_err(|err| VectorMismatch::MalformedVector {
            detail: err.to_string(),
        })?;
    if let Some(offset) = first_difference(&expected_bytes, &actual_bytes) {
        return Err(VectorMismatch::CanonicalBytes {
            offset,
            expected_len: expected_bytes.len(),
            actual_len: actual_bytes.len(),
        });
    }
    if expected.object_id != actual.object_id {
        return Err(VectorMismatch::ObjectId {
            expected: expected.object_id,
            actual: actual.object_id,
        });
    }
    match (&expected.signature, &actual.signature) {
        (None, _) => Ok(()),
        (Some(_), None) => Err(VectorMismatch::Signature {
            detail: "no signature produced".to_string(),
        }),
        (Some(exp), Some(act)) => {
            if exp.public_key != act.public_key {
                return Err(VectorMismatch::Signature {
                    detail: format!("public key: expected {}, got {}", exp.public_key, act.public_key),
                });
            }
            if !exp.signature.trim().eq_ignore_ascii_case(&act.signature) {
                return Err(VectorMismatch::Signature {
                    detail: format!("signature: expected {}, got {}", exp.signature, act.signature),
                });
            }
            let sig_bytes = hex::decode(exp.signature.trim())
                .map_err(|err| VectorMismatch::MalformedVector {
                    detail: format!("signature: {}", err),
                })?;
            check(&expected_bytes, &sig_bytes, &exp.public_key).map_err(|err| VectorMismatch::Signature {
                detail: err.to_string(),
            })
        }
    }
}

/// Offset of the first differing byte; the shorter length when one is a prefix.
fn first_difference(expected: &[u8], actual: &[u8]) -> Option<usize> {
    match expected.iter().zip(actual).position(|(a, b)| a != b) {
        Some(offset) => Some(offset),
        None if expected.len() != actual.len() => Some(expected.len().min(actual.len())),
        None => None,
    }
}
