use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol version 1: closed value model, no tags, strict key order.
pub const PROTOCOL_V1: u64 = 1;

/// Protocol version used when none is requested.
pub const CURRENT_PROTOCOL_VERSION: u64 = PROTOCOL_V1;

/// Every protocol version this build can encode and decode.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[u64] = &[PROTOCOL_V1];

/// Default nesting limit for decoded values.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// How the decoder treats map entries that are not in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrderPolicy {
    /// Out-of-order entries are rejected with `KeyOrderViolation`.
    Strict,
    /// Out-of-order entries are accepted; duplicates are still rejected.
    Permissive,
}

/// Error returned when a profile cannot be built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    /// The requested protocol version is not known to this build.
    #[error("unsupported protocol version: {version} (supported: {supported:?})")]
    UnsupportedVersion {
        /// Requested version.
        version: u64,
        /// Versions this build supports.
        supported: &'static [u64],
    },
}

/// The rule set a codec is bound to.
///
/// A profile is built once and then only read. Switching protocol versions
/// means building a new [`Codec`](crate::Codec), never mutating a live one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Protocol version this profile implements.
    pub protocol_version: u64,
    /// Tag numbers the decoder accepts. Empty under protocol v1.
    pub allowed_tags: BTreeSet<u64>,
    /// Key-order handling for decoded maps.
    pub key_order: KeyOrderPolicy,
    /// Maximum nesting depth of decoded arrays, maps and tags.
    pub max_depth: usize,
}

impl Profile {
    /// The protocol v1 rule set.
    pub fn v1() -> Self {
        Self {
            protocol_version: PROTOCOL_V1,
            allowed_tags: BTreeSet::new(),
            key_order: KeyOrderPolicy::Strict,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// The rule set for the current protocol version.
    pub fn current() -> Self {
        Self::v1()
    }

    /// Looks up the rule set for a protocol version.
    pub fn for_version(version: u64) -> Result<Self, ProfileError> {
        match version {
            PROTOCOL_V1 => Ok(Self::v1()),
            _ => Err(ProfileError::UnsupportedVersion {
                version,
                supported: SUPPORTED_PROTOCOL_VERSIONS,
            }),
        }
    }

    /// Returns a copy with a different key-order policy.
    pub fn with_key_order(mut self, policy: KeyOrderPolicy) -> Self {
        self.key_order = policy;
        self
    }

    /// Returns a copy that additionally accepts `tag`.
    pub fn with_allowed_tag(mut self, tag: u64) -> Self {
        self.allowed_tags.insert(tag);
        self
    }

    /// Returns a copy with a different nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Whether the decoder accepts `tag` under this profile.
    pub fn allows_tag(&self, tag: u64) -> bool {
        self.allowed_tags.contains(&tag)
    }

    /// Stable name used in reports, e.g. `keystone-cbor-v1`.
    pub fn name(&self) -> String {
        format!("keystone-cbor-v{}", self.protocol_version)
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_is_closed_and_strict() {
        let profile = Profile::v1();
        assert!(profile.allowed_tags.is_empty());
        assert_eq!(profile.key_order, KeyOrderPolicy::Strict);
        assert!(!profile.allows_tag(1));
        assert_eq!(profile.name(), "keystone-cbor-v1");
    }

    #[test]
    fn unknown_version_is_rejected() {
        let err = Profile::for_version(7).unwrap_err();
        assert_eq!(
            err,
            ProfileError::UnsupportedVersion {
                version: 7,
                supported: SUPPORTED_PROTOCOL_VERSIONS
            }
        );
        assert!(err.to_string().contains("unsupported protocol version: 7"));
    }

    #[test]
    fn builders_do_not_touch_the_original() {
        let base = Profile::v1();
        let extended = base.clone().with_allowed_tag(42).with_key_order(KeyOrderPolicy::Permissive);
        assert!(extended.allows_tag(42));
        assert!(!base.allows_tag(42));
        assert_eq!(base, Profile::for_version(PROTOCOL_V1).unwrap());
    }
}
