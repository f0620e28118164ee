//! Opaque identifiers issued by the backend.
//!
//! Both ids are treated as opaque strings: the engine never inspects their
//! structure, it only compares, hashes and orders them. Ordering of ids is
//! lexicographic and is used solely to break exact `created_at` ties.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error when parsing an identifier from a string
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("identifier must not be empty")]
    Empty,
    #[error("identifier must not contain whitespace")]
    Whitespace,
}

fn check(raw: &str) -> Result<(), IdParseError> {
    if raw.is_empty() {
        Err(IdParseError::Empty)
    } else if raw.chars().any(char::is_whitespace) {
        Err(IdParseError::Whitespace)
    } else {
        Ok(())
    }
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier without validation
            #[inline]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Parse a raw identifier, rejecting empty or whitespace-bearing input
            pub fn parse(raw: &str) -> Result<Self, IdParseError> {
                check(raw)?;
                Ok(Self(raw.to_string()))
            }

            /// Borrow the raw identifier
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Take the raw identifier
            #[inline]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_id!(
    /// Unique message identifier
    MessageId
);

opaque_id!(
    /// User identifier shared by messages, profiles and presence records
    UserId
);
