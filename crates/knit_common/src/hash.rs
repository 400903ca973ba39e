//! Source fingerprints and stable digests for generated names.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// XXH3-128 fingerprint of one source file.
///
/// Source manifests store it as 32 lowercase hex digits so `sources.json`
/// stays readable and diffable.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(u128);

impl ContentHash {
    /// Fingerprints `data`.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(data))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:08x}..)", self.0 >> 96)
    }
}

/// A manifest entry that is not a 32-digit hex fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseHashError(String);

impl fmt::Display for ParseHashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid content hash `{}`", self.0)
    }
}

impl std::error::Error for ParseHashError {}

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseHashError(s.to_string()));
        }
        u128::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| ParseHashError(s.to_string()))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Returns a short, build-stable base-36 digest of `data`.
///
/// Backed by XXH3-64, so the value never depends on process state or
/// platform and can be embedded in generated names.
pub fn short_digest(data: &[u8]) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut value = xxhash_rust::xxh3::xxh3_64(data);
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::with_capacity(13);
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_changes_fingerprint() {
        let before = ContentHash::from_bytes(br#"{"declarations": "function f() {}"}"#);
        let same = ContentHash::from_bytes(br#"{"declarations": "function f() {}"}"#);
        let after = ContentHash::from_bytes(br#"{"declarations": "function f() { return 1; }"}"#);
        assert_eq!(before, same);
        assert_ne!(before, after);
    }

    #[test]
    fn hex_form_parses_back() {
        let h = ContentHash::from_bytes(b"lib/core.json");
        let text = h.to_string();
        assert_eq!(text.len(), 32);
        assert_eq!(text.parse::<ContentHash>().unwrap(), h);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!("abc".parse::<ContentHash>().is_err());
        assert!("zz".repeat(16).parse::<ContentHash>().is_err());
        assert!("+".repeat(32).parse::<ContentHash>().is_err());
    }

    #[test]
    fn serializes_as_hex_string() {
        let h = ContentHash::from_bytes(b"app.json");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{h}\""));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
        assert!(serde_json::from_str::<ContentHash>("[1, 2]").is_err());
    }

    #[test]
    fn short_digest_is_stable_base36() {
        let a = short_digest(b"foo-bar");
        assert_eq!(a, short_digest(b"foo-bar"));
        assert!(!a.is_empty());
        assert!(a
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(a, short_digest(b"foo_bar"));
    }
}
