//! Canonical CBOR encoder.
//!
//! Rules applied:
//! - integers, lengths and tag numbers use the shortest argument encoding
//! - strings, arrays and maps are always definite-length
//! - map entries are ordered by encoded key length, then by encoded key bytes
//! - `false`, `true` and `null` are the single bytes `F4`, `F5`, `F6`
//!
//! Floats and indefinite-length items cannot be expressed by
//! [`CanonicalValue`], so encoding is total.

use std::cmp::Ordering;

use crate::value::{CanonicalMap, CanonicalValue, MapKey};

pub(crate) const MAJOR_UNSIGNED: u8 = 0;
pub(crate) const MAJOR_NEGATIVE: u8 = 1;
pub(crate) const MAJOR_BYTES: u8 = 2;
pub(crate) const MAJOR_TEXT: u8 = 3;
pub(crate) const MAJOR_ARRAY: u8 = 4;
pub(crate) const MAJOR_MAP: u8 = 5;
pub(crate) const MAJOR_TAG: u8 = 6;
pub(crate) const MAJOR_SIMPLE: u8 = 7;

pub(crate) const SIMPLE_FALSE: u8 = 20;
pub(crate) const SIMPLE_TRUE: u8 = 21;
pub(crate) const SIMPLE_NULL: u8 = 22;

/// Encodes a value to its canonical bytes.
pub fn encode(value: &CanonicalValue) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    tracing::trace!(len = out.len(), "encoded canonical value");
    out
}

/// Appends the canonical encoding of `value` to `out`.
pub fn encode_into(value: &CanonicalValue, out: &mut Vec<u8>) {
    match value {
        CanonicalValue::UInt(n) => write_header(out, MAJOR_UNSIGNED, *n),
        // -1 - n, which for negative n is the bitwise complement
        CanonicalValue::NegInt(n) if *n < 0 => write_header(out, MAJOR_NEGATIVE, !(*n as u64)),
        // out of range for major type 1; keep the integer's canonical form
        CanonicalValue::NegInt(n) => write_header(out, MAJOR_UNSIGNED, *n as u64),
        CanonicalValue::Bytes(b) => {
            write_header(out, MAJOR_BYTES, b.len() as u64);
            out.extend_from_slice(b);
        }
        CanonicalValue::Text(s) => {
            write_header(out, MAJOR_TEXT, s.len() as u64);
            out.extend_from_slice(s.as_bytes());
        }
        CanonicalValue::Array(items) => {
            write_header(out, MAJOR_ARRAY, items.len() as u64);
            for item in items {
                encode_into(item, out);
            }
        }
        CanonicalValue::Map(map) => encode_map_into(map, out),
        CanonicalValue::Bool(false) => out.push(MAJOR_SIMPLE << 5 | SIMPLE_FALSE),
        CanonicalValue::Bool(true) => out.push(MAJOR_SIMPLE << 5 | SIMPLE_TRUE),
        CanonicalValue::Null => out.push(MAJOR_SIMPLE << 5 | SIMPLE_NULL),
        CanonicalValue::Tag(tag, inner) => {
            write_header(out, MAJOR_TAG, *tag);
            encode_into(inner, out);
        }
    }
}

fn encode_map_into(map: &CanonicalMap, out: &mut Vec<u8>) {
    write_header(out, MAJOR_MAP, map.len() as u64);
    let mut entries: Vec<(Vec<u8>, &CanonicalValue)> =
        map.iter().map(|(k, v)| (k.encoded(), v)).collect();
    entries.sort_by(|(a, _), (b, _)| canonical_key_order(a, b));
    for (key, value) in entries {
        out.extend_from_slice(&key);
        encode_into(value, out);
    }
}

pub(crate) fn encode_key_into(key: &MapKey, out: &mut Vec<u8>) {
    match key {
        MapKey::Text(s) => {
            write_header(out, MAJOR_TEXT, s.len() as u64);
            out.extend_from_slice(s.as_bytes());
        }
        MapKey::Bytes(b) => {
            write_header(out, MAJOR_BYTES, b.len() as u64);
            out.extend_from_slice(b);
        }
    }
}

/// Orders two encoded map keys: shorter first, then bytewise.
///
/// This is the length-first ordering of RFC 7049 canonical CBOR,
/// not the bytewise ordering of newer deterministic profiles. Changing it is a
/// protocol version bump.
pub fn canonical_key_order(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Returns map entries in canonical order.
pub(crate) fn canonical_entries(map: &CanonicalMap) -> Vec<(&MapKey, &CanonicalValue)> {
    let mut entries: Vec<(Vec<u8>, &MapKey, &CanonicalValue)> =
        map.iter().map(|(k, v)| (k.encoded(), k, v)).collect();
    entries.sort_by(|(a, _, _), (b, _, _)| canonical_key_order(a, b));
    entries.into_iter().map(|(_, k, v)| (k, v)).collect()
}

/// Writes a major type with the shortest argument encoding.
pub(crate) fn write_header(out: &mut Vec<u8>, major: u8, arg: u64) {
    let major = major << 5;
    if arg < 24 {
        out.push(major | arg as u8);
    } else if arg <= u64::from(u8::MAX) {
        out.push(major | 24);
        out.push(arg as u8);
    } else if arg <= u64::from(u16::MAX) {
        out.push(major | 25);
        out.extend_from_slice(&(arg as u16).to_be_bytes());
    } else if arg <= u64::from(u32::MAX) {
        out.push(major | 26);
        out.extend_from_slice(&(arg as u32).to_be_bytes());
    } else {
        out.push(major | 27);
        out.extend_from_slice(&arg.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_of(value: &CanonicalValue) -> String {
        hex::encode(encode(value))
    }

    #[test]
    fn integers_use_shortest_form() {
        let cases: &[(u64, &str)] = &[
            (0, "00"),
            (23, "17"),
            (24, "1818"),
            (255, "18ff"),
            (256, "190100"),
            (65535, "19ffff"),
            (65536, "1a00010000"),
            (u64::from(u32::MAX), "1affffffff"),
            (u64::from(u32::MAX) + 1, "1b0000000100000000"),
            (u64::MAX, "1bffffffffffffffff"),
        ];
        for (n, expected) in cases {
            assert_eq!(hex_of(&CanonicalValue::UInt(*n)), *expected, "encoding {n}");
        }
    }

    #[test]
    fn negative_integers() {
        assert_eq!(hex_of(&CanonicalValue::NegInt(-1)), "20");
        assert_eq!(hex_of(&CanonicalValue::NegInt(-24)), "37");
        assert_eq!(hex_of(&CanonicalValue::NegInt(-25)), "3818");
        assert_eq!(hex_of(&CanonicalValue::NegInt(-257)), "390100");
        assert_eq!(hex_of(&CanonicalValue::NegInt(i64::MIN)), "3b7fffffffffffffff");
    }

    #[test]
    fn non_negative_neg_int_encodes_as_unsigned() {
        let bytes = encode(&CanonicalValue::NegInt(5));
        assert_eq!(bytes, encode(&CanonicalValue::integer(5)));
        assert_eq!(
            crate::decode(&bytes, &crate::Profile::v1()).unwrap(),
            CanonicalValue::UInt(5)
        );
        assert_eq!(hex_of(&CanonicalValue::NegInt(0)), "00");
    }

    #[test]
    fn map_keys_sorted_length_first() {
        let value = CanonicalValue::map([
            ("bb", CanonicalValue::from(1u64)),
            ("z", CanonicalValue::from(2u64)),
            ("a", CanonicalValue::from(3u64)),
        ]);
        assert_eq!(hex_of(&value), "a3616103617a0262626201");
    }

    #[test]
    fn map_order_independent_of_construction() {
        let forward = CanonicalValue::map([("b", CanonicalValue::from(1u64)), ("a", CanonicalValue::from(0u64))]);
        let reverse = CanonicalValue::map([("a", CanonicalValue::from(0u64)), ("b", CanonicalValue::from(1u64))]);
        assert_eq!(hex_of(&forward), "a2616100616201");
        assert_eq!(encode(&forward), encode(&reverse));
    }

    #[test]
    fn byte_keys_sort_by_encoded_form() {
        let mut map = CanonicalMap::new();
        map.insert(MapKey::Text("a".into()), CanonicalValue::from(2u64));
        map.insert(MapKey::Bytes(b"a".to_vec()), CanonicalValue::from(1u64));
        assert_eq!(hex_of(&CanonicalValue::Map(map)), "a2416101616102");
    }

    #[test]
    fn simple_values_and_strings() {
        assert_eq!(hex_of(&CanonicalValue::Bool(false)), "f4");
        assert_eq!(hex_of(&CanonicalValue::Bool(true)), "f5");
        assert_eq!(hex_of(&CanonicalValue::Null), "f6");
        assert_eq!(hex_of(&CanonicalValue::text("")), "60");
        assert_eq!(hex_of(&CanonicalValue::bytes(vec![0xde, 0xad])), "42dead");
        assert_eq!(hex_of(&CanonicalValue::Array(vec![])), "80");
    }

    #[test]
    fn text_is_not_normalized() {
        let composed = encode(&CanonicalValue::text("\u{e9}"));
        let decomposed = encode(&CanonicalValue::text("e\u{301}"));
        assert_eq!(hex::encode(&composed), "62c3a9");
        assert_eq!(hex::encode(&decomposed), "6365cc81");
    }

    #[test]
    fn long_string_length_header() {
        let text = "x".repeat(300);
        let bytes = encode(&CanonicalValue::text(text));
        assert_eq!(&bytes[..3], &[0x79, 0x01, 0x2c]);
        assert_eq!(bytes.len(), 303);
    }
}
