use std::fmt;

use crate::encoder;

/// Key of a canonical map entry.
///
/// Only text and byte strings may key a map. A text key and a byte-string key
/// holding the same bytes are distinct keys because their encodings differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    /// UTF-8 text key.
    Text(String),
    /// Byte-string key.
    Bytes(Vec<u8>),
}

impl MapKey {
    /// Returns the canonical encoding of this key, the form map ordering is computed on.
    pub fn encoded(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encoder::encode_key_into(self, &mut out);
        out
    }

    /// Returns the key as text, if it is a text key.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MapKey::Text(s) => Some(s),
            MapKey::Bytes(_) => None,
        }
    }
}

impl From<&str> for MapKey {
    fn from(value: &str) -> Self {
        MapKey::Text(value.to_string())
    }
}

impl From<String> for MapKey {
    fn from(value: String) -> Self {
        MapKey::Text(value)
    }
}

impl From<MapKey> for CanonicalValue {
    fn from(key: MapKey) -> Self {
        match key {
            MapKey::Text(s) => CanonicalValue::Text(s),
            MapKey::Bytes(b) => CanonicalValue::Bytes(b),
        }
    }
}

/// A map with unique keys and no inherent order.
///
/// Iteration follows construction order, but that order carries no meaning:
/// equality ignores it and the encoder sorts entries by their encoded keys.
#[derive(Debug, Clone, Default)]
pub struct CanonicalMap {
    entries: Vec<(MapKey, CanonicalValue)>,
}

impl CanonicalMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Inserts an entry, returning the previous value if the key was present.
    pub fn insert(&mut self, key: impl Into<MapKey>, value: CanonicalValue) -> Option<CanonicalValue> {
        let key = key.into();
        if let Some((_, slot)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Appends an entry whose key the caller has already proven unique.
    pub(crate) fn push_unique(&mut self, key: MapKey, value: CanonicalValue) {
        self.entries.push((key, value));
    }

    /// Looks up a value by key.
    pub fn get(&self, key: &MapKey) -> Option<&CanonicalValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Looks up a value by text key.
    pub fn get_text(&self, key: &str) -> Option<&CanonicalValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_text() == Some(key))
            .map(|(_, v)| v)
    }

    /// Removes an entry, returning its value.
    pub fn remove(&mut self, key: &MapKey) -> Option<CanonicalValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in construction order.
    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &CanonicalValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl PartialEq for CanonicalMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for CanonicalMap {}

impl<K: Into<MapKey>> FromIterator<(K, CanonicalValue)> for CanonicalMap {
    fn from_iter<I: IntoIterator<Item = (K, CanonicalValue)>>(iter: I) -> Self {
        let mut map = CanonicalMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// The closed set of values that can be canonically encoded.
///
/// There is no floating-point variant. `Tag` is a version-gated extension
/// point: only a decoder whose profile allowlists the tag number produces it,
/// and ingestion never does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalValue {
    /// Unsigned integer (major type 0).
    UInt(u64),
    /// Negative integer (major type 1).
    ///
    /// Build it with [`CanonicalValue::integer`]. A non-negative payload is
    /// encoded as the equal unsigned integer and so decodes as `UInt`.
    NegInt(i64),
    /// Definite-length byte string.
    Bytes(Vec<u8>),
    /// Definite-length UTF-8 text, never normalized.
    Text(String),
    /// Ordered sequence.
    Array(Vec<CanonicalValue>),
    /// Map with unique text or byte-string keys.
    Map(CanonicalMap),
    /// Boolean.
    Bool(bool),
    /// Null.
    Null,
    /// Tagged value, only produced under a profile that allows the tag.
    Tag(u64, Box<CanonicalValue>),
}

impl CanonicalValue {
    /// Builds an integer value, choosing `UInt` or `NegInt` by sign.
    pub fn integer(n: i64) -> Self {
        if n < 0 {
            CanonicalValue::NegInt(n)
        } else {
            CanonicalValue::UInt(n as u64)
        }
    }

    /// Builds a text value.
    pub fn text(s: impl Into<String>) -> Self {
        CanonicalValue::Text(s.into())
    }

    /// Builds a byte-string value.
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        CanonicalValue::Bytes(b.into())
    }

    /// Builds a map from key/value pairs; later duplicates replace earlier ones.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<MapKey>,
        I: IntoIterator<Item = (K, CanonicalValue)>,
    {
        CanonicalValue::Map(entries.into_iter().collect())
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            CanonicalValue::UInt(_) => "unsigned integer",
            CanonicalValue::NegInt(_) => "negative integer",
            CanonicalValue::Bytes(_) => "byte string",
            CanonicalValue::Text(_) => "text string",
            CanonicalValue::Array(_) => "array",
            CanonicalValue::Map(_) => "map",
            CanonicalValue::Bool(_) => "boolean",
            CanonicalValue::Null => "null",
            CanonicalValue::Tag(_, _) => "tag",
        }
    }

    /// Returns the map, if this is a map.
    pub fn as_map(&self) -> Option<&CanonicalMap> {
        match self {
            CanonicalValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the elements, if this is an array.
    pub fn as_array(&self) -> Option<&[CanonicalValue]> {
        match self {
            CanonicalValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the text, if this is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CanonicalValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bytes, if this is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CanonicalValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the integer, if this is an unsigned integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CanonicalValue::UInt(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<u64> for CanonicalValue {
    fn from(n: u64) -> Self {
        CanonicalValue::UInt(n)
    }
}

impl From<i64> for CanonicalValue {
    fn from(n: i64) -> Self {
        CanonicalValue::integer(n)
    }
}

impl From<bool> for CanonicalValue {
    fn from(b: bool) -> Self {
        CanonicalValue::Bool(b)
    }
}

impl From<&str> for CanonicalValue {
    fn from(s: &str) -> Self {
        CanonicalValue::Text(s.to_string())
    }
}

impl From<String> for CanonicalValue {
    fn from(s: String) -> Self {
        CanonicalValue::Text(s)
    }
}

impl From<CanonicalMap> for CanonicalValue {
    fn from(map: CanonicalMap) -> Self {
        CanonicalValue::Map(map)
    }
}

/// Renders CBOR diagnostic notation, with map entries in canonical order.
impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalValue::UInt(n) => write!(f, "{n}"),
            CanonicalValue::NegInt(n) => write!(f, "{n}"),
            CanonicalValue::Bytes(b) => write!(f, "h'{}'", hex::encode(b)),
            CanonicalValue::Text(s) => write_text(f, s),
            CanonicalValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            CanonicalValue::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in encoder::canonical_entries(map).into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match key {
                        MapKey::Text(s) => write_text(f, s)?,
                        MapKey::Bytes(b) => write!(f, "h'{}'", hex::encode(b))?,
                    }
                    write!(f, ": {value}")?;
                }
                f.write_str("}")
            }
            CanonicalValue::Bool(b) => write!(f, "{b}"),
            CanonicalValue::Null => f.write_str("null"),
            CanonicalValue::Tag(tag, inner) => write!(f, "{tag}({inner})"),
        }
    }
}

fn write_text(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    match serde_json::to_string(s) {
        Ok(quoted) => f.write_str(&quoted),
        Err(_) => Err(fmt::Error),
    }
}
