use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::VectorError;

macro_rules! newtype {
    ($name:ident, $doc:expr, $pattern:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parses a validated identifier from a string.
            pub fn parse(value: impl Into<String>) -> Result<Self, VectorError> {
                let s = value.into();
                let matches = Regex::new($pattern)
                    .map(|re| re.is_match(&s))
                    .unwrap_or(false);
                if !matches {
                    return Err(VectorError::PatternMismatch {
                        field: stringify!($name),
                        value: s,
                    });
                }
                Ok(Self(s))
            }

            /// The identifier text.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = VectorError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

newtype!(
    VectorId,
    "Identifier of a conformance vector (lowercase, 3 to 64 of `a-z0-9._-`).",
    r"^[a-z0-9][a-z0-9._-]{2,63}$"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_kebab_ids() {
        assert!(VectorId::parse("map-key-order-basic").is_ok());
        assert!(VectorId::parse("v2.decode_reject-01").is_ok());
    }

    #[test]
    fn rejects_bad_ids() {
        let long = "x".repeat(65);
        for bad in ["", "ab", "Upper-case", "-leading", "has space", long.as_str()] {
            assert!(VectorId::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn deserialization_validates() {
        let ok: VectorId = serde_json::from_str(r#""scalar-null""#).unwrap();
        assert_eq!(ok.as_str(), "scalar-null");
        assert!(serde_json::from_str::<VectorId>(r#""NOPE""#).is_err());
    }
}
