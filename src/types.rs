//! NewType wrappers for strong typing across the security layer.
//!
//! These keep operation names, principals and key hashes from being mixed up
//! with each other or with raw credential strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a `String` newtype that serializes as a bare string and can be
/// looked up by `&str` in maps.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Identifier of the API operation being authenticated (e.g. "getCurrentUser").
    ///
    /// Passed through untouched to handlers and credential sources so they can
    /// apply per-operation policy. The security layer never interprets it.
    OperationName
);

newtype_string!(
    /// Identity derived from a validated credential.
    ///
    /// Chosen by the handler; for static keys this is `api_key:<hash prefix>`.
    Principal
);

newtype_string!(
    /// Hex-encoded SHA-256 of an API key. Raw keys are never stored.
    ApiKeyHash
);
