//! Strict validating decoder.
//!
//! Every byte sequence yields exactly one of a [`CanonicalValue`] or a
//! [`Rejection`]. There is no best-effort mode: the first violated rule stops
//! decoding and is reported with the offset of the data item that broke it.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoder::{
    canonical_key_order, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_SIMPLE,
    MAJOR_TAG, MAJOR_TEXT, MAJOR_UNSIGNED, SIMPLE_FALSE, SIMPLE_NULL, SIMPLE_TRUE,
};
use crate::profile::{KeyOrderPolicy, Profile};
use crate::value::{CanonicalMap, CanonicalValue, MapKey};

const INFO_ONE_BYTE: u8 = 24;
const INFO_EIGHT_BYTES: u8 = 27;
const INFO_INDEFINITE: u8 = 31;

/// Why a byte sequence is not canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// An integer, length or tag number uses a longer argument than needed.
    NonCanonicalInteger,
    /// An indefinite-length string, array or map.
    IndefiniteLength,
    /// The same encoded key appears twice in one map.
    DuplicateMapKey,
    /// A half, single or double precision float.
    FloatingPointValue,
    /// A tag the active profile does not allowlist.
    UnexpectedTag,
    /// Text string bytes are not valid UTF-8.
    InvalidUtf8,
    /// Map entries are not in canonical key order.
    KeyOrderViolation,
    /// The input ends inside a data item.
    TruncatedInput,
    /// Bytes follow a complete top-level item.
    TrailingBytes,
    /// A negative integer below `i64::MIN`.
    IntegerOutOfRange,
    /// A map key that is neither a text nor a byte string.
    InvalidMapKey,
    /// A simple value other than `false`, `true` or `null`.
    UnsupportedSimpleValue,
    /// Reserved additional information, or a break byte outside any item.
    MalformedHeader,
    /// Nesting deeper than the profile allows.
    NestingTooDeep,
}

impl RejectionReason {
    /// Every reason, in declaration order.
    pub const ALL: [RejectionReason; 14] = [
        RejectionReason::NonCanonicalInteger,
        RejectionReason::IndefiniteLength,
        RejectionReason::DuplicateMapKey,
        RejectionReason::FloatingPointValue,
        RejectionReason::UnexpectedTag,
        RejectionReason::InvalidUtf8,
        RejectionReason::KeyOrderViolation,
        RejectionReason::TruncatedInput,
        RejectionReason::TrailingBytes,
        RejectionReason::IntegerOutOfRange,
        RejectionReason::InvalidMapKey,
        RejectionReason::UnsupportedSimpleValue,
        RejectionReason::MalformedHeader,
        RejectionReason::NestingTooDeep,
    ];

    /// Stable snake_case code used in vectors and CLI output.
    pub fn code(self) -> &'static str {
        match self {
            RejectionReason::NonCanonicalInteger => "non_canonical_integer",
            RejectionReason::IndefiniteLength => "indefinite_length",
            RejectionReason::DuplicateMapKey => "duplicate_map_key",
            RejectionReason::FloatingPointValue => "floating_point_value",
            RejectionReason::UnexpectedTag => "unexpected_tag",
            RejectionReason::InvalidUtf8 => "invalid_utf8",
            RejectionReason::KeyOrderViolation => "key_order_violation",
            RejectionReason::TruncatedInput => "truncated_input",
            RejectionReason::TrailingBytes => "trailing_bytes",
            RejectionReason::IntegerOutOfRange => "integer_out_of_range",
            RejectionReason::InvalidMapKey => "invalid_map_key",
            RejectionReason::UnsupportedSimpleValue => "unsupported_simple_value",
            RejectionReason::MalformedHeader => "malformed_header",
            RejectionReason::NestingTooDeep => "nesting_too_deep",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RejectionReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RejectionReason::ALL
            .into_iter()
            .find(|reason| reason.code() == s)
            .ok_or_else(|| format!("unknown rejection reason: {s}"))
    }
}

/// A decoding failure: the rule that was broken and where.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{reason} at byte offset {offset}")]
pub struct Rejection {
    /// The violated rule.
    pub reason: RejectionReason,
    /// Offset of the data item that violated it (for `TrailingBytes`, the
    /// first trailing byte).
    pub offset: usize,
}

impl Rejection {
    fn new(reason: RejectionReason, offset: usize) -> Self {
        tracing::debug!(%reason, offset, "rejected non-canonical input");
        Self { reason, offset }
    }
}

/// Decodes exactly one canonical data item from `bytes` under `profile`.
pub fn decode(bytes: &[u8], profile: &Profile) -> Result<CanonicalValue, Rejection> {
    let mut reader = Reader {
        input: bytes,
        pos: 0,
        profile,
    };
    let value = reader.read_value(0)?;
    if reader.pos != bytes.len() {
        return Err(Rejection::new(RejectionReason::TrailingBytes, reader.pos));
    }
    Ok(value)
}

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    profile: &'a Profile,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    fn take(&mut self, len: u64, item_start: usize) -> Result<&'a [u8], Rejection> {
        let input = self.input;
        match usize::try_from(len) {
            Ok(len) if len <= self.remaining() => {
                let slice = &input[self.pos..self.pos + len];
                self.pos += len;
                Ok(slice)
            }
            _ => Err(Rejection::new(RejectionReason::TruncatedInput, item_start)),
        }
    }

    /// Reads the argument for additional information 24..=27 and checks that
    /// it could not have been written shorter.
    fn read_argument(&mut self, info: u8, item_start: usize) -> Result<u64, Rejection> {
        let width = 1u64 << (info - INFO_ONE_BYTE);
        let raw = self.take(width, item_start)?;
        let arg = raw.iter().fold(0u64, |acc, b| acc << 8 | u64::from(*b));
        let minimal = match info {
            24 => arg >= 24,
            25 => arg > u64::from(u8::MAX),
            26 => arg > u64::from(u16::MAX),
            _ => arg > u64::from(u32::MAX),
        };
        if !minimal {
            return Err(Rejection::new(RejectionReason::NonCanonicalInteger, item_start));
        }
        Ok(arg)
    }

    fn read_value(&mut self, depth: usize) -> Result<CanonicalValue, Rejection> {
        let start = self.pos;
        if depth > self.profile.max_depth {
            return Err(Rejection::new(RejectionReason::NestingTooDeep, start));
        }
        let initial = self.take(1, start)?[0];
        let major = initial >> 5;
        let info = initial & 0x1f;

        if major == MAJOR_SIMPLE {
            return self.read_simple(info, start);
        }

        let arg = match info {
            0..=23 => u64::from(info),
            INFO_ONE_BYTE..=INFO_EIGHT_BYTES => self.read_argument(info, start)?,
            INFO_INDEFINITE => {
                let reason = match major {
                    MAJOR_BYTES | MAJOR_TEXT | MAJOR_ARRAY | MAJOR_MAP => {
                        RejectionReason::IndefiniteLength
                    }
                    _ => RejectionReason::MalformedHeader,
                };
                return Err(Rejection::new(reason, start));
            }
            _ => return Err(Rejection::new(RejectionReason::MalformedHeader, start)),
        };

        match major {
            MAJOR_UNSIGNED => Ok(CanonicalValue::UInt(arg)),
            MAJOR_NEGATIVE => match i64::try_from(arg) {
                Ok(n) => Ok(CanonicalValue::NegInt(-1 - n)),
                Err(_) => Err(Rejection::new(RejectionReason::IntegerOutOfRange, start)),
            },
            MAJOR_BYTES => Ok(CanonicalValue::Bytes(self.take(arg, start)?.to_vec())),
            MAJOR_TEXT => {
                let raw = self.take(arg, start)?;
                match std::str::from_utf8(raw) {
                    Ok(text) => Ok(CanonicalValue::Text(text.to_string())),
                    Err(_) => Err(Rejection::new(RejectionReason::InvalidUtf8, start)),
                }
            }
            MAJOR_ARRAY => self.read_array(arg, depth, start),
            MAJOR_MAP => self.read_map(arg, depth, start),
            MAJOR_TAG => {
                if !self.profile.allows_tag(arg) {
                    return Err(Rejection::new(RejectionReason::UnexpectedTag, start));
                }
                let inner = self.read_value(depth + 1)?;
                Ok(CanonicalValue::Tag(arg, Box::new(inner)))
            }
            _ => Err(Rejection::new(RejectionReason::MalformedHeader, start)),
        }
    }

    fn read_simple(&mut self, info: u8, start: usize) -> Result<CanonicalValue, Rejection> {
        match info {
            SIMPLE_FALSE => Ok(CanonicalValue::Bool(false)),
            SIMPLE_TRUE => Ok(CanonicalValue::Bool(true)),
            SIMPLE_NULL => Ok(CanonicalValue::Null),
            25..=27 => Err(Rejection::new(RejectionReason::FloatingPointValue, start)),
            28..=31 => Err(Rejection::new(RejectionReason::MalformedHeader, start)),
            _ => Err(Rejection::new(RejectionReason::UnsupportedSimpleValue, start)),
        }
    }

    fn read_array(&mut self, len: u64, depth: usize, start: usize) -> Result<CanonicalValue, Rejection> {
        // every element needs at least one byte
        if len > self.remaining() as u64 {
            return Err(Rejection::new(RejectionReason::TruncatedInput, start));
        }
        let mut items = Vec::with_capacity(len as usize);
        for _ in 0..len {
            items.push(self.read_value(depth + 1)?);
        }
        Ok(CanonicalValue::Array(items))
    }

    fn read_map(&mut self, len: u64, depth: usize, start: usize) -> Result<CanonicalValue, Rejection> {
        // every entry needs at least two bytes
        if len > (self.remaining() / 2) as u64 {
            return Err(Rejection::new(RejectionReason::TruncatedInput, start));
        }
        let mut map = CanonicalMap::with_capacity(len as usize);
        let mut previous: Option<&'a [u8]> = None;
        let mut seen: BTreeSet<&'a [u8]> = BTreeSet::new();

        for _ in 0..len {
            let key_start = self.pos;
            let key = match self.read_value(depth + 1)? {
                CanonicalValue::Text(s) => MapKey::Text(s),
                CanonicalValue::Bytes(b) => MapKey::Bytes(b),
                _ => return Err(Rejection::new(RejectionReason::InvalidMapKey, key_start)),
            };
            let input = self.input;
            let encoded_key = &input[key_start..self.pos];

            match self.profile.key_order {
                KeyOrderPolicy::Strict => {
                    if let Some(prev) = previous {
                        match canonical_key_order(prev, encoded_key) {
                            Ordering::Less => {}
                            Ordering::Equal => {
                                return Err(Rejection::new(RejectionReason::DuplicateMapKey, key_start))
                            }
                            Ordering::Greater => {
                                return Err(Rejection::new(RejectionReason::KeyOrderViolation, key_start))
                            }
                        }
                    }
                    previous = Some(encoded_key);
                }
                KeyOrderPolicy::Permissive => {
                    if !seen.insert(encoded_key) {
                        return Err(Rejection::new(RejectionReason::DuplicateMapKey, key_start));
                    }
                }
            }

            let value = self.read_value(depth + 1)?;
            map.push_unique(key, value);
        }
        Ok(CanonicalValue::Map(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;

    fn reject(hex_input: &str) -> Rejection {
        let bytes = hex::decode(hex_input).unwrap();
        decode(&bytes, &Profile::v1()).unwrap_err()
    }

    fn accept(hex_input: &str) -> CanonicalValue {
        let bytes = hex::decode(hex_input).unwrap();
        decode(&bytes, &Profile::v1()).unwrap()
    }

    #[test]
    fn decodes_canonical_map() {
        let value = accept("a2616100616201");
        let map = value.as_map().unwrap();
        assert_eq!(map.get_text("a"), Some(&CanonicalValue::UInt(0)));
        assert_eq!(map.get_text("b"), Some(&CanonicalValue::UInt(1)));
    }

    #[test]
    fn rejects_non_minimal_arguments() {
        for input in ["1817", "1900ff", "1a0000ffff", "1b00000000ffffffff", "3817", "780161", "9800"] {
            let rejection = reject(input);
            assert_eq!(rejection.reason, RejectionReason::NonCanonicalInteger, "input {input}");
            assert_eq!(rejection.offset, 0);
        }
    }

    #[test]
    fn rejects_indefinite_lengths() {
        for input in ["5f4101ff", "7f6161ff", "9f01ff", "bf616100ff"] {
            assert_eq!(reject(input).reason, RejectionReason::IndefiniteLength, "input {input}");
        }
        assert_eq!(reject("1f").reason, RejectionReason::MalformedHeader);
    }

    #[test]
    fn rejects_floats() {
        for input in ["f93e00", "fa3fc00000", "fb3ff8000000000000"] {
            assert_eq!(reject(input).reason, RejectionReason::FloatingPointValue, "input {input}");
        }
    }

    #[test]
    fn rejects_tags_unless_allowlisted() {
        assert_eq!(reject("c11a514b67b0").reason, RejectionReason::UnexpectedTag);
        let profile = Profile::v1().with_allowed_tag(1);
        let value = decode(&hex::decode("c11a514b67b0").unwrap(), &profile).unwrap();
        assert_eq!(value, CanonicalValue::Tag(1, Box::new(CanonicalValue::UInt(1_363_896_240))));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let rejection = reject("8262c328");
        assert_eq!(rejection.reason, RejectionReason::InvalidUtf8);
        assert_eq!(rejection.offset, 1);
    }

    #[test]
    fn duplicate_and_order_violations_point_at_the_key() {
        let dup = reject("a2616100616101");
        assert_eq!((dup.reason, dup.offset), (RejectionReason::DuplicateMapKey, 4));
        let order = reject("a2616201616100");
        assert_eq!((order.reason, order.offset), (RejectionReason::KeyOrderViolation, 4));
        let length_first = reject("a262616101616202");
        assert_eq!(length_first.reason, RejectionReason::KeyOrderViolation);
        assert_eq!(length_first.offset, 5);
    }

    #[test]
    fn permissive_profile_accepts_unordered_but_not_duplicates() {
        let profile = Profile::v1().with_key_order(KeyOrderPolicy::Permissive);
        let value = decode(&hex::decode("a2616201616100").unwrap(), &profile).unwrap();
        assert_eq!(hex::encode(encode(&value)), "a2616100616201");
        let dup = decode(&hex::decode("a2616100616101").unwrap(), &profile).unwrap_err();
        assert_eq!(dup.reason, RejectionReason::DuplicateMapKey);
    }

    #[test]
    fn truncation_and_trailing_bytes() {
        assert_eq!(reject("").reason, RejectionReason::TruncatedInput);
        assert_eq!(reject("6261").reason, RejectionReason::TruncatedInput);
        assert_eq!(reject("1a0000").reason, RejectionReason::TruncatedInput);
        assert_eq!(reject("a16161"), Rejection { reason: RejectionReason::TruncatedInput, offset: 3 });
        assert_eq!(reject("0000"), Rejection { reason: RejectionReason::TrailingBytes, offset: 1 });
    }

    #[test]
    fn huge_length_claims_fail_before_allocating() {
        assert_eq!(reject("5bffffffffffffffff").reason, RejectionReason::TruncatedInput);
        assert_eq!(reject("9bffffffffffffffff").reason, RejectionReason::TruncatedInput);
        assert_eq!(reject("bbffffffffffffffff").reason, RejectionReason::TruncatedInput);
    }

    #[test]
    fn rejects_unsupported_shapes() {
        assert_eq!(reject("f7").reason, RejectionReason::UnsupportedSimpleValue);
        assert_eq!(reject("f820").reason, RejectionReason::UnsupportedSimpleValue);
        assert_eq!(reject("ff").reason, RejectionReason::MalformedHeader);
        assert_eq!(reject("1c").reason, RejectionReason::MalformedHeader);
        assert_eq!(reject("a10100"), Rejection { reason: RejectionReason::InvalidMapKey, offset: 1 });
        assert_eq!(reject("3bffffffffffffffff").reason, RejectionReason::IntegerOutOfRange);
        assert_eq!(accept("3b7fffffffffffffff"), CanonicalValue::NegInt(i64::MIN));
    }

    #[test]
    fn nesting_limit_is_enforced() {
        let mut bytes = vec![0x81; 10];
        bytes.push(0x00);
        let shallow = Profile::v1().with_max_depth(4);
        let rejection = decode(&bytes, &shallow).unwrap_err();
        assert_eq!(rejection.reason, RejectionReason::NestingTooDeep);
        assert_eq!(rejection.offset, 5);
        assert!(decode(&bytes, &Profile::v1()).is_ok());
    }

    #[test]
    fn reason_codes_round_trip_through_from_str() {
        for reason in RejectionReason::ALL {
            assert_eq!(reason.code().parse::<RejectionReason>(), Ok(reason));
        }
        assert!("no_such_reason".parse::<RejectionReason>().is_err());
    }
}
