//! Typed cache generation versioning.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three cache generation classes that exist concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheClass {
    /// Shell document, offline document, web app manifest and icons.
    Static,
    /// Everything not otherwise classified.
    Dynamic,
    /// Content-addressed or long-TTL assets (fonts, bundled chunks).
    Immutable,
}

impl CacheClass {
    /// All classes, in install order.
    pub const ALL: [CacheClass; 3] = [
        CacheClass::Static,
        CacheClass::Dynamic,
        CacheClass::Immutable,
    ];

    /// Stable name used inside cache generation names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
            Self::Immutable => "immutable",
        }
    }
}

impl fmt::Display for CacheClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build-time deploy version, threaded through cache-name construction and
/// the activation cleanup predicate.
///
/// Exactly one generation per class is current at a time; currency is an
/// exact name match derived from this single token. Keeping the token typed
/// means no caller can construct a generation name with a stale prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    /// Create a token from a deploy version string (e.g. `"v42"`).
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the current generation for a class, e.g. `v42-static`.
    pub fn generation_name(&self, class: CacheClass) -> String {
        format!("{}-{}", self.0, class.as_str())
    }

    /// Whether a stored cache name belongs to this version.
    ///
    /// This is the eviction predicate applied on activation: every cache
    /// this version does not own is deleted.
    pub fn owns(&self, cache_name: &str) -> bool {
        cache_name
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
