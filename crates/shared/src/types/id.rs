//! Typed IDs for type-safe entity references.
//!
//! Identifiers are issued by the auth provider and the document database as opaque
//! strings. They end up inside object keys, document paths and public URLs, so an ID
//! is limited to ASCII letters, digits, `_` and `-`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a raw string cannot be used as an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The identifier is empty or only whitespace.
    #[error("identifier is empty")]
    Empty,

    /// The identifier contains a character that would break keys, paths or URLs.
    #[error("identifier contains forbidden character {0:?}")]
    ForbiddenChar(char),
}

fn validate_id(raw: &str) -> Result<(), IdError> {
    if raw.is_empty() {
        return Err(IdError::Empty);
    }

    match raw
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-')))
    {
        Some(c) => Err(IdError::ForbiddenChar(c)),
        None => Ok(()),
    }
}

/// Macro to generate string-backed typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates an ID from a raw string, rejecting unusable values.
            pub fn parse(raw: impl Into<String>) -> Result<Self, IdError> {
                let raw = raw.into();
                validate_id(&raw)?;
                Ok(Self(raw))
            }

            /// Returns the ID as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

typed_id!(OwnerId, "Identifier of the signed-in user that owns an upload or action.");
typed_id!(PostId, "Identifier of a post document.");
typed_id!(CommentId, "Identifier of a comment document.");
