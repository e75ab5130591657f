//! Ed25519 signing and verification over canonical bytes.
//!
//! The message is always the exact canonical byte sequence of an object. A
//! signature is bound to those bytes: any re-encoding, however equivalent its
//! decoded value, does not verify.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use keystone_canonical::{encode, CanonicalValue};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::errors::SignatureError;

/// Length of an Ed25519 secret seed.
pub const SECRET_KEY_LEN: usize = 32;
/// Length of an Ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;
/// Length of an Ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

/// An Ed25519 secret seed.
///
/// The seed lives in zeroizing storage and is wiped when the key is dropped.
/// It cannot be cloned, printed or serialized.
pub struct SecretKey {
    seed: Zeroizing<[u8; SECRET_KEY_LEN]>,
}

impl SecretKey {
    /// Wraps a 32-byte seed.
    pub fn from_bytes(seed: [u8; SECRET_KEY_LEN]) -> Self {
        Self {
            seed: Zeroizing::new(seed),
        }
    }

    /// Reads a seed from a byte slice of exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() != SECRET_KEY_LEN {
            return Err(SignatureError::MalformedKey(format!(
                "secret key must be {} bytes, got {}",
                SECRET_KEY_LEN,
                bytes.len()
            )));
        }
        let mut seed = Zeroizing::new([0u8; SECRET_KEY_LEN]);
        seed.copy_from_slice(bytes);
        Ok(Self { seed })
    }

    /// Reads a seed from 64 hex characters. Surrounding whitespace is ignored.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let decoded = hex::decode(s.trim())
            .map(Zeroizing::new)
            .map_err(|_| SignatureError::MalformedKey("secret key is not valid hex".to_string()))?;
        Self::from_slice(&decoded)
    }

    /// The public key matching this seed.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key().verifying_key().to_bytes())
    }

    fn signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.seed)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

/// A validated Ed25519 public key, also used as a signer's key id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Validates 32 bytes as a curve point.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Result<Self, SignatureError> {
        VerifyingKey::from_bytes(&bytes)
            .map_err(|err| SignatureError::MalformedKey(err.to_string()))?;
        Ok(Self(bytes))
    }

    /// Validates a byte slice of exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignatureError> {
        let bytes: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| {
            SignatureError::MalformedKey(format!(
                "public key must be {} bytes, got {}",
                PUBLIC_KEY_LEN,
                bytes.len()
            ))
        })?;
        Self::from_bytes(bytes)
    }

    /// Parses 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(s.trim())
            .map_err(|_| SignatureError::MalformedKey("public key is not valid hex".to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn verifying_key(&self) -> Result<VerifyingKey, SignatureError> {
        VerifyingKey::from_bytes(&self.0).map_err(|err| SignatureError::MalformedKey(err.to_string()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for PublicKey {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A detached signature: the signer's key id plus the 64 signature bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SignatureRepr", into = "SignatureRepr")]
pub struct Signature {
    key_id: PublicKey,
    bytes: [u8; SIGNATURE_LEN],
}

impl Signature {
    /// Assembles a signature from its parts.
    pub fn new(key_id: PublicKey, bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self { key_id, bytes }
    }

    /// The signer's public key.
    pub fn key_id(&self) -> &PublicKey {
        &self.key_id
    }

    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.bytes
    }

    /// Lowercase hex of the signature bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

#[derive(Serialize, Deserialize)]
struct SignatureRepr {
    key_id: PublicKey,
    signature: String,
}

impl From<Signature> for SignatureRepr {
    fn from(sig: Signature) -> Self {
        Self {
            key_id: sig.key_id,
            signature: sig.to_hex(),
        }
    }
}

impl TryFrom<SignatureRepr> for Signature {
    type Error = String;

    fn try_from(repr: SignatureRepr) -> Result<Self, Self::Error> {
        let mut bytes = [0u8; SIGNATURE_LEN];
        hex::decode_to_slice(&repr.signature, &mut bytes)
            .map_err(|err| format!("invalid signature hex: {}", err))?;
        Ok(Self::new(repr.key_id, bytes))
    }
}

/// Signs canonical bytes. Ed25519 is deterministic: the same key and bytes
/// always give the same signature.
pub fn sign(canonical_bytes: &[u8], secret: &SecretKey) -> Signature {
    let signing_key = secret.signing_key();
    let bytes = signing_key.sign(canonical_bytes).to_bytes();
    Signature::new(PublicKey(signing_key.verifying_key().to_bytes()), bytes)
}

/// Checks raw signature bytes over canonical bytes.
pub fn check(
    canonical_bytes: &[u8],
    signature_bytes: &[u8],
    public_key: &PublicKey,
) -> Result<(), SignatureError> {
    let signature = ed25519_dalek::Signature::from_slice(signature_bytes)
        .map_err(|_| SignatureError::InvalidSignature)?;
    public_key
        .verifying_key()?
        .verify_strict(canonical_bytes, &signature)
        .map_err(|_| {
            tracing::debug!(key_id = %public_key, "signature verification failed");
            SignatureError::InvalidSignature
        })
}

/// Returns whether `signature_bytes` is a valid signature over `canonical_bytes`.
pub fn verify(canonical_bytes: &[u8], signature_bytes: &[u8], public_key: &PublicKey) -> bool {
    check(canonical_bytes, signature_bytes, public_key).is_ok()
}

/// Checks a detached signature, requiring it to name `expected` as signer.
pub fn check_signature(
    canonical_bytes: &[u8],
    signature: &Signature,
    expected: &PublicKey,
) -> Result<(), SignatureError> {
    if signature.key_id != *expected {
        return Err(SignatureError::KeyMismatch {
            expected: *expected,
            actual: signature.key_id,
        });
    }
    check(canonical_bytes, &signature.bytes, expected)
}

/// Encodes `value` canonically and signs the result.
pub fn sign_value(value: &CanonicalValue, secret: &SecretKey) -> Signature {
    sign(&encode(value), secret)
}

/// Encodes `value` canonically and checks `signature` against its key id.
pub fn verify_value(value: &CanonicalValue, signature: &Signature) -> Result<(), SignatureError> {
    check(&encode(value), &signature.bytes, &signature.key_id)
}
