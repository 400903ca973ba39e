//! Symbol tags: globally unique identifiers for one declaration.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Separator between a tag's namespace prefix and its disambiguating suffix.
const NAMESPACE_SEPARATOR: char = '|';

/// An opaque, globally unique identifier for one declaration's symbol.
///
/// Tags order lexicographically by their string form; export naming relies on
/// that order being stable across builds.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Creates a tag from its string form.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag's string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the portion of the tag before its disambiguating suffix.
    ///
    /// For `"kotlin.collections|listOf(0:0){}"` this is `"kotlin.collections"`.
    /// A tag without a separator is its own namespace.
    pub fn namespace(&self) -> &str {
        match self.0.find(NAMESPACE_SEPARATOR) {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({:?})", self.0)
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Tag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for Tag {
    fn borrow(&self) -> &str {
        &self.0
    }
}
