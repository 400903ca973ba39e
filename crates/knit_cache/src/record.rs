//! Binary header record describing a module's symbol surface.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! u8   export surface flag (0 or 1)
//! u32  entry count
//! per entry, in ascending tag order:
//!   u32 tag length, tag bytes (UTF-8)
//!   u8  mask: bit 0 = definition, bit 1 = local name follows
//!   [u32 name length, name bytes (UTF-8)]   if bit 1 is set
//! ```
//!
//! Decoding is strict. Anything that does not match the layout exactly is
//! rejected so the caller can treat it as a cache miss.

use std::collections::{BTreeMap, BTreeSet};

use knit_common::Tag;

use crate::error::CacheError;

const MASK_DEFINITION: u8 = 0b01;
const MASK_NAME_BINDING: u8 = 0b10;

/// Immutable snapshot of one module's symbol surface.
///
/// `external_names` is derived at construction: every bound tag the module
/// does not define itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderRecord {
    has_export_surface: bool,
    definitions: BTreeSet<Tag>,
    name_bindings: BTreeMap<Tag, String>,
    external_names: BTreeSet<Tag>,
}

impl HeaderRecord {
    /// Creates a record from its defining parts.
    pub fn new(
        has_export_surface: bool,
        definitions: BTreeSet<Tag>,
        name_bindings: BTreeMap<Tag, String>,
    ) -> Self {
        let external_names = name_bindings
            .keys()
            .filter(|tag| !definitions.contains(*tag))
            .cloned()
            .collect();
        Self {
            has_export_surface,
            definitions,
            name_bindings,
            external_names,
        }
    }

    /// Whether the module exposes anything to the host environment.
    pub fn has_export_surface(&self) -> bool {
        self.has_export_surface
    }

    /// Tags this module defines.
    pub fn definitions(&self) -> &BTreeSet<Tag> {
        &self.definitions
    }

    /// Tags the module binds but does not define.
    pub fn external_names(&self) -> &BTreeSet<Tag> {
        &self.external_names
    }

    /// Local name bound to `tag`, if any.
    pub fn local_name(&self, tag: &Tag) -> Option<&str> {
        self.name_bindings.get(tag).map(String::as_str)
    }

    /// Serializes the record. Equal records always produce equal bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut entries: BTreeMap<&Tag, (u8, Option<&str>)> = BTreeMap::new();
        for (tag, name) in &self.name_bindings {
            entries.insert(tag, (MASK_NAME_BINDING, Some(name.as_str())));
        }
        for tag in &self.definitions {
            entries.entry(tag).or_insert((0, None)).0 |= MASK_DEFINITION;
        }

        let mut out = Vec::new();
        out.push(u8::from(self.has_export_surface));
        out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for (tag, (mask, name)) in entries {
            write_str(&mut out, tag.as_str());
            out.push(mask);
            if let Some(name) = name {
                write_str(&mut out, name);
            }
        }
        out
    }

    /// Parses a record produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, CacheError> {
        let mut reader = Reader { bytes, pos: 0 };

        let has_export_surface = match reader.u8()? {
            0 => false,
            1 => true,
            other => {
                return Err(CacheError::malformed(format!(
                    "invalid export surface flag {other}"
                )))
            }
        };

        let count = reader.u32()?;
        let mut definitions = BTreeSet::new();
        let mut name_bindings = BTreeMap::new();
        let mut seen = BTreeSet::new();

        for _ in 0..count {
            let tag = Tag::new(reader.string()?);
            let mask = reader.u8()?;
            if mask == 0 || mask & !(MASK_DEFINITION | MASK_NAME_BINDING) != 0 {
                return Err(CacheError::malformed(format!(
                    "invalid mask {mask:#04b} for tag `{tag}`"
                )));
            }
            if !seen.insert(tag.clone()) {
                return Err(CacheError::malformed(format!("duplicate tag `{tag}`")));
            }
            if mask & MASK_NAME_BINDING != 0 {
                name_bindings.insert(tag.clone(), reader.string()?);
            }
            if mask & MASK_DEFINITION != 0 {
                definitions.insert(tag);
            }
        }

        if reader.pos != bytes.len() {
            return Err(CacheError::malformed(format!(
                "{} trailing bytes",
                bytes.len() - reader.pos
            )));
        }

        Ok(Self::new(has_export_surface, definitions, name_bindings))
    }
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], CacheError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| CacheError::malformed("unexpected end of record"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, CacheError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, CacheError> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn string(&mut self) -> Result<String, CacheError> {
        let len = self.u32()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| CacheError::malformed("string is not valid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(exports: bool, defs: &[&str], names: &[(&str, &str)]) -> HeaderRecord {
        HeaderRecord::new(
            exports,
            defs.iter().map(|t| Tag::from(*t)).collect(),
            names
                .iter()
                .map(|(t, n)| (Tag::from(*t), n.to_string()))
                .collect(),
        )
    }

    #[test]
    fn external_names_exclude_definitions() {
        let r = record(false, &["a"], &[("a", "foo"), ("b", "bar")]);
        let ext: Vec<&str> = r.external_names().iter().map(Tag::as_str).collect();
        assert_eq!(ext, vec!["b"]);
    }

    #[test]
    fn roundtrip_preserves_everything() {
        let r = record(true, &["lib|a", "lib|c"], &[("lib|a", "a"), ("ext|b", "b")]);
        let back = HeaderRecord::decode(&r.encode()).unwrap();
        assert_eq!(back, r);
        assert!(back.has_export_surface());
        assert!(back.definitions().contains("lib|c"));
        assert_eq!(back.local_name(&Tag::new("lib|c")), None);
    }

    #[test]
    fn exact_byte_layout() {
        let r = record(true, &["a"], &[("a", "x"), ("b", "y")]);
        let bytes = r.encode();
        let expected: Vec<u8> = [
            &[1u8][..],
            &2u32.to_le_bytes(),
            &1u32.to_le_bytes(),
            b"a",
            &[0b11],
            &1u32.to_le_bytes(),
            b"x",
            &1u32.to_le_bytes(),
            b"b",
            &[0b10],
            &1u32.to_le_bytes(),
            b"y",
        ]
        .concat();
        assert_eq!(bytes, expected);
    }

    #[test]
    fn encoding_is_independent_of_insertion_order() {
        let a = record(false, &["x", "y"], &[("x", "1"), ("y", "2")]);
        let b = record(false, &["y", "x"], &[("y", "2"), ("x", "1")]);
        assert_eq!(a.encode(), b.encode());
    }

    #[test]
    fn empty_record() {
        let r = HeaderRecord::default();
        assert_eq!(r.encode(), vec![0, 0, 0, 0, 0]);
        assert_eq!(HeaderRecord::decode(&r.encode()).unwrap(), r);
    }

    #[test]
    fn truncated_record_is_rejected() {
        let bytes = record(false, &["abc"], &[("abc", "n")]).encode();
        for len in 0..bytes.len() {
            assert!(
                HeaderRecord::decode(&bytes[..len]).is_err(),
                "prefix of length {len} decoded"
            );
        }
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = record(false, &["a"], &[]).encode();
        bytes.push(0);
        assert!(HeaderRecord::decode(&bytes).is_err());
    }

    #[test]
    fn bad_flag_is_rejected() {
        let mut bytes = HeaderRecord::default().encode();
        bytes[0] = 7;
        assert!(HeaderRecord::decode(&bytes).is_err());
    }

    #[test]
    fn unknown_mask_bits_are_rejected() {
        let mut bytes = record(false, &["a"], &[]).encode();
        let mask_pos = 1 + 4 + 4 + 1;
        bytes[mask_pos] = 0b101;
        assert!(HeaderRecord::decode(&bytes).is_err());
        bytes[mask_pos] = 0;
        assert!(HeaderRecord::decode(&bytes).is_err());
    }

    #[test]
    fn huge_count_fails_without_allocating() {
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(HeaderRecord::decode(&bytes).is_err());
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(&2u32.to_le_bytes());
        for _ in 0..2 {
            bytes.extend_from_slice(&1u32.to_le_bytes());
            bytes.push(b't');
            bytes.push(MASK_DEFINITION);
        }
        assert!(HeaderRecord::decode(&bytes).is_err());
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.push(MASK_DEFINITION);
        assert!(HeaderRecord::decode(&bytes).is_err());
    }
}
