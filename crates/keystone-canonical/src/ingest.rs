//! Ingestion of structured descriptions.
//!
//! This is the single point where "numbers as written by a human" become
//! protocol integers. JSON objects become maps with text keys, arrays stay
//! arrays, strings pass through unnormalized. Any number that is not an exact
//! integer in `[i64::MIN, u64::MAX]` is rejected, as is any object that names
//! the same member twice.

use std::collections::HashSet;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::value::RawValue;
use serde_json::Value;
use thiserror::Error;

use crate::value::{CanonicalMap, CanonicalValue, MapKey};

/// Error returned when a description cannot become a canonical value.
#[derive(Error, Debug)]
pub enum IngestionError {
    /// The input is not well-formed JSON.
    #[error("invalid structured description: {0}")]
    Parse(#[from] serde_json::Error),
    /// A number with a fraction or exponent, or outside the integer range.
    #[error("non-integer number {value} at {path}")]
    FloatingPointValue {
        /// Path of the offending field.
        path: String,
        /// The number as parsed.
        value: String,
    },
    /// An object member name used twice.
    #[error("duplicate key at {path}")]
    DuplicateKey {
        /// Path of the repeated member.
        path: String,
    },
}

impl IngestionError {
    /// Stable snake_case code used in vectors and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            IngestionError::Parse(_) => "parse_error",
            IngestionError::FloatingPointValue { .. } => "floating_point_value",
            IngestionError::DuplicateKey { .. } => "duplicate_key",
        }
    }

    /// Path of the offending field, when there is one.
    pub fn path(&self) -> Option<&str> {
        match self {
            IngestionError::Parse(_) => None,
            IngestionError::FloatingPointValue { path, .. } | IngestionError::DuplicateKey { path } => {
                Some(path)
            }
        }
    }
}

/// A generic structured tree as it arrives from a producer.
///
/// Unlike `serde_json::Value`, object members keep their order and their
/// duplicates, and floats survive parsing so they can be rejected by name.
#[derive(Debug, Clone, PartialEq)]
pub enum Description {
    /// `null`.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// Non-negative integer.
    UInt(u64),
    /// Negative integer.
    NegInt(i64),
    /// Any other number.
    Float(f64),
    /// String.
    String(String),
    /// Array.
    Array(Vec<Description>),
    /// Object members in input order, duplicates included.
    Object(Vec<(String, Description)>),
}

impl Description {
    /// Parses JSON text.
    ///
    /// Numbers are classified by their literal form: a literal without a
    /// fraction or exponent is an integer, so `-0` is zero while `-0.0` is
    /// not an integer.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: Box<RawValue> = serde_json::from_str(json)?;
        Self::from_raw(&raw)
    }

    fn from_raw(raw: &RawValue) -> Result<Self, serde_json::Error> {
        let text = raw.get().trim();
        match text.as_bytes().first() {
            Some(b'{') => {
                let Members(members) = serde_json::from_str(text)?;
                let mut out = Vec::with_capacity(members.len());
                for (key, value) in members {
                    out.push((key, Self::from_raw(&value)?));
                }
                Ok(Description::Object(out))
            }
            Some(b'[') => {
                let items: Vec<Box<RawValue>> = serde_json::from_str(text)?;
                let mut out = Vec::with_capacity(items.len());
                for item in &items {
                    out.push(Self::from_raw(item)?);
                }
                Ok(Description::Array(out))
            }
            Some(b'-' | b'0'..=b'9') => Ok(Self::from_number_literal(text)),
            _ => match serde_json::from_str::<Value>(text)? {
                Value::Bool(b) => Ok(Description::Bool(b)),
                Value::String(s) => Ok(Description::String(s)),
                other => Ok(Description::from(&other)),
            },
        }
    }

    fn from_number_literal(literal: &str) -> Self {
        if !literal.contains(['.', 'e', 'E']) {
            if let Ok(n) = literal.parse::<u64>() {
                return Description::UInt(n);
            }
            if let Ok(n) = literal.parse::<i64>() {
                return if n < 0 {
                    Description::NegInt(n)
                } else {
                    Description::UInt(n as u64)
                };
            }
        }
        Description::Float(literal.parse::<f64>().unwrap_or(f64::NAN))
    }
}

impl<'de> Deserialize<'de> for Description {
    /// Only JSON deserializers are supported: the literal text of each number
    /// is needed to classify it.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Description::from_raw(&raw).map_err(de::Error::custom)
    }
}

/// Object members in input order, duplicates included.
struct Members(Vec<(String, Box<RawValue>)>);

impl<'de> Deserialize<'de> for Members {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MembersVisitor)
    }
}

struct MembersVisitor;

impl<'de> Visitor<'de> for MembersVisitor {
    type Value = Members;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Members, A::Error> {
        let mut members = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Box<RawValue>>()? {
            members.push((key, value));
        }
        Ok(Members(members))
    }
}

impl From<&Value> for Description {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Description::Null,
            Value::Bool(b) => Description::Bool(*b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Description::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    Description::NegInt(i)
                } else {
                    Description::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Description::String(s.clone()),
            Value::Array(items) => Description::Array(items.iter().map(Description::from).collect()),
            Value::Object(members) => Description::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), Description::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Helper for building field paths during ingestion.
#[derive(Debug, Clone)]
struct Path {
    segments: Vec<String>,
}

impl Path {
    fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    fn push_field(&self, field: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(field.to_string());
        Self { segments }
    }

    fn push_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(format!("[{}]", index));
        Self { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "root");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && !segment.starts_with('[') {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// Converts a description into a canonical value.
pub fn from_description(description: &Description) -> Result<CanonicalValue, IngestionError> {
    ingest(description, &Path::root())
}

/// Parses JSON text and converts it, detecting duplicate members.
pub fn from_json_str(json: &str) -> Result<CanonicalValue, IngestionError> {
    let description = Description::from_json(json)?;
    from_description(&description)
}

/// Converts an already-parsed JSON value.
///
/// `serde_json::Value` has already collapsed duplicate members and turned
/// `-0` into a float; prefer [`from_json_str`] when the raw text is available.
pub fn from_json_value(value: &Value) -> Result<CanonicalValue, IngestionError> {
    from_description(&Description::from(value))
}

fn ingest(description: &Description, path: &Path) -> Result<CanonicalValue, IngestionError> {
    match description {
        Description::Null => Ok(CanonicalValue::Null),
        Description::Bool(b) => Ok(CanonicalValue::Bool(*b)),
        Description::UInt(n) => Ok(CanonicalValue::UInt(*n)),
        Description::NegInt(n) => Ok(CanonicalValue::integer(*n)),
        Description::Float(f) => {
            tracing::debug!(%path, "rejecting non-integer number");
            Err(IngestionError::FloatingPointValue {
                path: path.to_string(),
                value: f.to_string(),
            })
        }
        Description::String(s) => Ok(CanonicalValue::Text(s.clone())),
        Description::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                out.push(ingest(item, &path.push_index(idx))?);
            }
            Ok(CanonicalValue::Array(out))
        }
        Description::Object(members) => {
            let mut seen = HashSet::with_capacity(members.len());
            let mut map = CanonicalMap::with_capacity(members.len());
            for (key, child) in members {
                let child_path = path.push_field(key);
                if !seen.insert(key.as_str()) {
                    tracing::debug!(path = %child_path, "rejecting duplicate member");
                    return Err(IngestionError::DuplicateKey {
                        path: child_path.to_string(),
                    });
                }
                let value = ingest(child, &child_path)?;
                map.push_unique(MapKey::Text(key.clone()), value);
            }
            Ok(CanonicalValue::Map(map))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_json_shapes() {
        let value = from_json_str(r#"{"n": -3, "ok": true, "none": null, "list": ["x", 7]}"#).unwrap();
        let expected = CanonicalValue::map([
            ("n", CanonicalValue::NegInt(-3)),
            ("ok", CanonicalValue::Bool(true)),
            ("none", CanonicalValue::Null),
            (
                "list",
                CanonicalValue::Array(vec![CanonicalValue::text("x"), CanonicalValue::UInt(7)]),
            ),
        ]);
        assert_eq!(value, expected);
    }

    #[test]
    fn rejects_fraction_at_root() {
        let err = from_json_str("1.5").unwrap_err();
        assert_eq!(err.code(), "floating_point_value");
        assert_eq!(err.path(), Some("root"));
    }

    #[test]
    fn rejects_integral_float_forms_with_path() {
        let err = from_json_str(r#"{"a": [1, 2.0]}"#).unwrap_err();
        assert_eq!(err.path(), Some("a[1]"));
        let err = from_json_str(r#"{"outer": {"n": 1e3}}"#).unwrap_err();
        assert_eq!(err.path(), Some("outer.n"));
        assert_eq!(err.code(), "floating_point_value");
    }

    #[test]
    fn integer_range_edges() {
        assert_eq!(
            from_json_str("18446744073709551615").unwrap(),
            CanonicalValue::UInt(u64::MAX)
        );
        assert_eq!(
            from_json_str("-9223372036854775808").unwrap(),
            CanonicalValue::NegInt(i64::MIN)
        );
        assert!(matches!(
            from_json_str("18446744073709551616"),
            Err(IngestionError::FloatingPointValue { .. })
        ));
        assert!(matches!(
            from_json_str("-9223372036854775809"),
            Err(IngestionError::FloatingPointValue { .. })
        ));
    }

    #[test]
    fn negative_zero_literal_is_integer_zero() {
        let value = from_json_str(r#"{"n": -0}"#).unwrap();
        assert_eq!(value, CanonicalValue::map([("n", CanonicalValue::UInt(0))]));
        assert_eq!(hex::encode(crate::encode(&value)), "a1616e00");
        assert_eq!(Description::from_json("-0").unwrap(), Description::UInt(0));

        for literal in ["-0.0", "-0e0", "0.0", "0E0"] {
            let err = from_json_str(literal).unwrap_err();
            assert_eq!(err.code(), "floating_point_value", "{}", literal);
        }
    }

    #[test]
    fn duplicate_members_are_rejected() {
        let err = from_json_str(r#"{"x": {"a": 1, "a": 2}}"#).unwrap_err();
        assert_eq!(err.code(), "duplicate_key");
        assert_eq!(err.path(), Some("x.a"));
    }

    #[test]
    fn strings_are_not_coerced() {
        let value = from_json_str(r#"{"n": "42"}"#).unwrap();
        assert_eq!(value.as_map().unwrap().get_text("n"), Some(&CanonicalValue::text("42")));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = from_json_str(r#"{"a": 1"#).unwrap_err();
        assert_eq!(err.code(), "parse_error");
        assert!(err.path().is_none());
        assert!(matches!(from_json_str(r#""\ud800""#), Err(IngestionError::Parse(_))));
    }

    #[test]
    fn parsed_values_ingest_the_same() {
        let value = json!({"b": 1, "a": [true, -1]});
        let from_value = from_json_value(&value).unwrap();
        let from_text = from_json_str(&value.to_string()).unwrap();
        assert_eq!(from_value, from_text);
        assert!(from_json_value(&json!({"f": 0.5})).is_err());
    }
}
