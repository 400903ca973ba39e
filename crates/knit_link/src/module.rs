//! In-memory module model: fragments, loaded modules, and module headers.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use knit_cache::HeaderRecord;
use knit_common::Tag;
use serde::{Deserialize, Serialize};

/// One compiled source unit as produced by the front-end.
///
/// The code fields are opaque to the linker; only the symbol tables are
/// inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Package the fragment was compiled from.
    #[serde(default)]
    pub package: String,
    /// Tags declared by this fragment.
    #[serde(default)]
    pub definitions: BTreeSet<Tag>,
    /// Local name for every tag the fragment refers to.
    #[serde(default)]
    pub name_bindings: BTreeMap<Tag, String>,
    /// Declaration code.
    #[serde(default)]
    pub declarations: String,
    /// Code exposing declarations to the host environment.
    #[serde(default)]
    pub exports: String,
    /// Entry-point invocation, emitted only for the main bundle.
    #[serde(default)]
    pub main_call: Option<String>,
}

impl Fragment {
    /// Whether this fragment exposes anything to the host environment.
    pub fn has_exports(&self) -> bool {
        !self.exports.trim().is_empty()
    }
}

/// A module fully loaded into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    /// Internal module name.
    pub name: String,
    /// Name other bundles import this module by.
    pub external_name: String,
    /// Compiled fragments, in source order.
    pub fragments: Vec<Fragment>,
}

impl LoadedModule {
    /// Computes the authoritative header of a loaded module.
    pub fn make_header(self: Arc<Self>) -> ModuleHeader {
        let mut definitions = BTreeSet::new();
        let mut name_bindings = BTreeMap::new();
        let mut has_export_surface = false;
        for fragment in &self.fragments {
            has_export_surface |= fragment.has_exports();
            for (tag, name) in &fragment.name_bindings {
                name_bindings.insert(tag.clone(), name.clone());
            }
            definitions.extend(fragment.definitions.iter().cloned());
        }

        ModuleHeader {
            name: self.name.clone(),
            external_name: self.external_name.clone(),
            record: Arc::new(HeaderRecord::new(has_export_surface, definitions, name_bindings)),
            module: Some(self),
        }
    }
}

/// Snapshot of a module's symbol surface for one build.
///
/// Built either from a cached [`HeaderRecord`] or from a freshly loaded
/// module; in the latter case it also holds the loaded module. Never
/// modified after construction.
#[derive(Debug, Clone)]
pub struct ModuleHeader {
    name: String,
    external_name: String,
    record: Arc<HeaderRecord>,
    module: Option<Arc<LoadedModule>>,
}

impl ModuleHeader {
    /// Wraps a header record read from the cache.
    pub fn cached(name: impl Into<String>, external_name: impl Into<String>, record: HeaderRecord) -> Self {
        Self {
            name: name.into(),
            external_name: external_name.into(),
            record: Arc::new(record),
            module: None,
        }
    }

    /// Internal module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// External module name.
    pub fn external_name(&self) -> &str {
        &self.external_name
    }

    /// The persisted form of this header.
    pub fn record(&self) -> &HeaderRecord {
        &self.record
    }

    /// Tags this module defines.
    pub fn definitions(&self) -> &BTreeSet<Tag> {
        self.record.definitions()
    }

    /// Tags this module imports from elsewhere.
    pub fn external_names(&self) -> &BTreeSet<Tag> {
        self.record.external_names()
    }

    /// Local name bound to `tag` in this module.
    pub fn local_name(&self, tag: &Tag) -> Option<&str> {
        self.record.local_name(tag)
    }

    /// Whether the module exposes anything to the host environment.
    pub fn has_export_surface(&self) -> bool {
        self.record.has_export_surface()
    }

    /// The loaded module, present only if it was (re)loaded this build.
    pub fn module(&self) -> Option<&Arc<LoadedModule>> {
        self.module.as_ref()
    }

    /// Whether the module was (re)loaded this build.
    pub fn is_loaded(&self) -> bool {
        self.module.is_some()
    }
}
