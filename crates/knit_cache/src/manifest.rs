//! Source fingerprints recorded per module.
//!
//! The manifest is stored as `sources.json` in a module's cache directory and
//! records the content hash of every source file the module was built from.
//! Comparing it with fresh hashes tells whether the module's sources changed
//! since the last successful build.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use knit_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::store::write_atomic;

/// Name of the manifest file within a module cache directory.
const MANIFEST_FILE: &str = "sources.json";

/// Content hashes of a module's source files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceManifest {
    /// knit version that wrote this manifest. Invalidate on version change.
    pub knit_version: String,

    /// Content hash per source path.
    pub files: BTreeMap<PathBuf, ContentHash>,
}

/// Result of comparing two manifests of the same module.
///
/// Paths within each list are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Files that are not present in the previous manifest.
    pub new_files: Vec<PathBuf>,

    /// Files whose content hash differs from the previous manifest.
    pub modified_files: Vec<PathBuf>,

    /// Files present previously but not any more.
    pub deleted_files: Vec<PathBuf>,
}

impl ChangeSet {
    /// Returns `true` if `path` is new or modified.
    pub fn is_dirty(&self, path: &Path) -> bool {
        self.new_files.iter().any(|p| p == path) || self.modified_files.iter().any(|p| p == path)
    }
}

impl SourceManifest {
    /// Creates an empty manifest for the given knit version.
    pub fn new(knit_version: &str) -> Self {
        Self {
            knit_version: knit_version.to_string(),
            files: BTreeMap::new(),
        }
    }

    /// Hashes `paths` into a fresh manifest.
    ///
    /// Files that cannot be read are left out, so they show up as deleted
    /// when compared with an older manifest.
    pub fn capture(knit_version: &str, paths: &[PathBuf]) -> Self {
        let mut manifest = Self::new(knit_version);
        for path in paths {
            if let Ok(hash) = hash_file(path) {
                manifest.files.insert(path.clone(), hash);
            }
        }
        manifest
    }

    /// Loads the manifest from `cache_dir`, returning `None` if it is
    /// missing or cannot be parsed.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(cache_dir.join(MANIFEST_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Saves the manifest into `cache_dir`, creating the directory if needed.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        write_atomic(&cache_dir.join(MANIFEST_FILE), json.as_bytes())
    }

    /// Returns `true` if this manifest was produced by a compatible knit version.
    pub fn is_compatible(&self, current_version: &str) -> bool {
        self.knit_version == current_version
    }

    /// Compares `current` against this (previous) manifest.
    pub fn detect_changes(&self, current: &SourceManifest) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for (path, hash) in &current.files {
            match self.files.get(path) {
                Some(previous) if previous == hash => {}
                Some(_) => changes.modified_files.push(path.clone()),
                None => changes.new_files.push(path.clone()),
            }
        }
        changes.deleted_files = self
            .files
            .keys()
            .filter(|p| !current.files.contains_key(*p))
            .cloned()
            .collect();

        changes
    }
}

/// Computes the XXH3-128 content hash of a file.
fn hash_file(path: &Path) -> Result<ContentHash, CacheError> {
    let content = std::fs::read(path).map_err(|e| CacheError::io(path, e))?;
    Ok(ContentHash::from_bytes(&content))
}
