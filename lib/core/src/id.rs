//! Strongly-typed identifier wrappers.
//!
//! A `SubjectId` is the raw, provider-assigned user identifier. A
//! `DerivedId` is what leaves this process: either the subject id itself or
//! its salted hash. Keeping them as distinct types means a raw subject id
//! can never be forwarded by accident where a derived one is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a strongly-typed wrapper around an opaque string id.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an id from a string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the id, returning the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
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
    };
}

define_id!(
    /// Identifier assigned to a user by the identity provider.
    SubjectId
);

define_id!(
    /// Pseudonymous identifier derived from a [`SubjectId`].
    DerivedId
);

impl DerivedId {
    /// Passes a subject id through unchanged.
    #[must_use]
    pub fn unhashed(subject: &SubjectId) -> Self {
        Self(subject.as_str().to_string())
    }
}
