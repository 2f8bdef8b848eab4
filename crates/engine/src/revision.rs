//! Identifiers used as table keys and blob marks.

use std::borrow::Borrow;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Dotted revision number such as `1.2` or `1.1.2.1`.
///
/// Equality is exact string equality; no numeric normalisation happens.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    /// Wraps a revision number.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The revision number as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RevisionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RevisionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RevisionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for RevisionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Output identifier written as `mark :<mark>` in a blob record.
///
/// Job files may give marks as JSON numbers or strings. A string mark must
/// be non-empty and free of whitespace and control characters, since it is
/// written verbatim into the record header.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Mark(String);

impl Mark {
    /// Wraps an output identifier.
    #[must_use]
    pub fn new(mark: impl Into<String>) -> Self {
        Self(mark.into())
    }

    /// The mark as text, without the leading `:`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Mark {
    fn from(mark: &str) -> Self {
        Self(mark.to_owned())
    }
}

impl From<u64> for Mark {
    fn from(mark: u64) -> Self {
        Self(mark.to_string())
    }
}

impl<'de> Deserialize<'de> for Mark {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(number) => Ok(Self::from(number)),
            Raw::Text(text) if text.is_empty() => Err(D::Error::custom("mark is empty")),
            Raw::Text(text) => match text.chars().find(|c| c.is_whitespace() || c.is_control()) {
                Some(c) => Err(D::Error::custom(format_args!(
                    "mark {text:?} contains {c:?}"
                ))),
                None => Ok(Self(text)),
            },
        }
    }
}
