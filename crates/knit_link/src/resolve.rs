//! Cross-module symbol resolution.
//!
//! Given the headers of every module in build order, the resolver decides
//! which module defines each imported tag, assigns deterministic export names
//! to the tags other modules consume, and builds the import wiring of every
//! loaded module. It is a pure function of the headers.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use knit_common::{InternalError, Tag};
use serde::Serialize;
use tracing::debug;

use crate::error::{LinkError, LinkResult};
use crate::module::ModuleHeader;
use crate::sanitize::sanitize_name;

/// Prefix of the local alias bound to an imported module.
const MODULE_ALIAS_PREFIX: &str = "$module$";

/// A module another bundle imports at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedModule {
    /// Name the module is published under.
    pub external_name: String,
    /// Local alias of the module object in the importing bundle.
    pub internal_name: String,
    /// Whether the specifier is a relative path.
    pub relative_require_path: bool,
}

impl ImportedModule {
    fn new(header: &ModuleHeader, relative_require_path: bool) -> Self {
        Self {
            external_name: header.external_name().to_string(),
            internal_name: format!("{MODULE_ALIAS_PREFIX}{}", sanitize_name(header.name())),
            relative_require_path,
        }
    }

    /// The specifier used in `require` or `import` for this module.
    pub fn specifier(&self, extension: &str) -> String {
        if self.relative_require_path {
            format!("./{}.{extension}", self.external_name)
        } else {
            self.external_name.clone()
        }
    }
}

/// How one imported tag is bound in the importing module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportBinding {
    /// Local name in the importing module.
    pub local_name: String,
    /// Name the defining module exports the tag under.
    pub exported_name: String,
    /// Alias of the defining module, see [`ImportedModule::internal_name`].
    pub module: String,
}

/// Import and export wiring of one loaded module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrossModuleReferences {
    /// Modules to import, in first-use order.
    pub imported_modules: Vec<ImportedModule>,
    /// Imported tag to its binding.
    pub imports: BTreeMap<Tag, ImportBinding>,
    /// Exported tag to its public name.
    pub exports: BTreeMap<Tag, String>,
    /// Modules whose host exports are re-exposed. Only the main module has any.
    pub transitive_exports: Vec<ImportedModule>,
}

/// An imported tag that no module defines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedImport {
    /// Importing module.
    pub module: String,
    /// The tag nobody defines.
    pub tag: Tag,
}

/// Result of resolving a whole program.
#[derive(Debug, Clone, Default)]
pub struct LinkOutput {
    /// Per module, in input order; `Some` exactly for loaded modules.
    pub references: Vec<Option<CrossModuleReferences>>,
    /// Imports without a defining module.
    pub unresolved: Vec<UnresolvedImport>,
}

/// Resolves cross-module references between module headers.
pub struct CrossModuleResolver<'a> {
    headers: &'a [ModuleHeader],
    relative_require_path: bool,
}

impl<'a> CrossModuleResolver<'a> {
    /// Creates a resolver over `headers`, main module last.
    pub fn new(headers: &'a [ModuleHeader], relative_require_path: bool) -> Self {
        Self {
            headers,
            relative_require_path,
        }
    }

    /// Runs the resolution.
    pub fn resolve(&self) -> LinkResult<LinkOutput> {
        let headers = self.headers;
        let count = headers.len();

        let mut defining_module: HashMap<&Tag, usize> = HashMap::new();
        for (index, header) in headers.iter().enumerate() {
            for tag in header.definitions() {
                if let Some(&first) = defining_module.get(tag) {
                    return Err(LinkError::DuplicateDefinition {
                        tag: tag.clone(),
                        first: headers[first].name().to_string(),
                        second: header.name().to_string(),
                    });
                }
                defining_module.insert(tag, index);
            }
        }

        let mut edges: Vec<Vec<(&Tag, usize)>> = vec![Vec::new(); count];
        let mut exported: Vec<BTreeSet<&Tag>> = vec![BTreeSet::new(); count];
        let mut unresolved = Vec::new();
        for (index, header) in headers.iter().enumerate() {
            for tag in header.external_names() {
                match defining_module.get(tag) {
                    Some(&definer) => {
                        edges[index].push((tag, definer));
                        exported[definer].insert(tag);
                    }
                    None => unresolved.push(UnresolvedImport {
                        module: header.name().to_string(),
                        tag: tag.clone(),
                    }),
                }
            }
        }

        let mut export_names: Vec<Option<BTreeMap<Tag, String>>> = vec![None; count];
        let mut references = Vec::with_capacity(count);
        for (index, header) in headers.iter().enumerate() {
            export_names[index] = Some(build_export_names(header, &exported[index])?);
            let refs = if header.is_loaded() {
                Some(self.build_references(index, &edges[index], &export_names)?)
            } else {
                None
            };
            references.push(refs);
        }

        if !unresolved.is_empty() {
            debug!(count = unresolved.len(), "unresolved imports");
        }
        Ok(LinkOutput {
            references,
            unresolved,
        })
    }

    fn build_references(
        &self,
        index: usize,
        edges: &[(&Tag, usize)],
        export_names: &[Option<BTreeMap<Tag, String>>],
    ) -> LinkResult<CrossModuleReferences> {
        let header = &self.headers[index];
        let mut handles = ModuleHandles::new(self.headers, self.relative_require_path);

        let mut imports = BTreeMap::new();
        for &(tag, definer) in edges {
            let names = export_names[definer]
                .as_ref()
                .ok_or_else(|| LinkError::ExportOrder {
                    namespace: tag.namespace().to_string(),
                    module: header.name().to_string(),
                })?;
            let exported_name = names.get(tag).cloned().ok_or_else(|| {
                InternalError::in_module(
                    header.name(),
                    format!(
                        "tag {tag} is not exported by `{}`",
                        self.headers[definer].name()
                    ),
                )
            })?;
            let local_name = header
                .local_name(tag)
                .ok_or_else(|| LinkError::MissingNameBinding {
                    tag: tag.clone(),
                    module: header.name().to_string(),
                })?
                .to_string();
            let module = handles.import(definer).internal_name.clone();
            imports.insert(
                tag.clone(),
                ImportBinding {
                    local_name,
                    exported_name,
                    module,
                },
            );
        }

        let mut transitive_exports = Vec::new();
        if index + 1 == self.headers.len() {
            for (other, other_header) in self.headers[..index].iter().enumerate() {
                if other_header.has_export_surface() {
                    transitive_exports.push(handles.import(other).clone());
                }
            }
        }

        Ok(CrossModuleReferences {
            imported_modules: handles.into_modules(),
            imports,
            exports: export_names[index].clone().unwrap_or_default(),
            transitive_exports,
        })
    }
}

/// Assigns a unique public name to every exported tag of `header`.
///
/// Tags are visited in ascending order, so colliding names get `_1`, `_2`, …
/// independent of how the module declared them.
fn build_export_names(
    header: &ModuleHeader,
    exported: &BTreeSet<&Tag>,
) -> LinkResult<BTreeMap<Tag, String>> {
    let mut taken: HashMap<String, usize> = HashMap::new();
    let mut names = BTreeMap::new();
    for &tag in exported {
        let local = header
            .local_name(tag)
            .ok_or_else(|| LinkError::MissingNameBinding {
                tag: tag.clone(),
                module: header.name().to_string(),
            })?;
        let base = sanitize_name(local);
        let seen = taken.entry(base.clone()).or_insert(0);
        let name = match *seen {
            0 => base,
            n => format!("{base}_{n}"),
        };
        *seen += 1;
        names.insert(tag.clone(), name);
    }
    Ok(names)
}

/// Deduplicated module imports of one module, in first-use order.
struct ModuleHandles<'a> {
    headers: &'a [ModuleHeader],
    relative_require_path: bool,
    modules: Vec<ImportedModule>,
    slots: HashMap<usize, usize>,
}

impl<'a> ModuleHandles<'a> {
    fn new(headers: &'a [ModuleHeader], relative_require_path: bool) -> Self {
        Self {
            headers,
            relative_require_path,
            modules: Vec::new(),
            slots: HashMap::new(),
        }
    }

    fn import(&mut self, index: usize) -> &ImportedModule {
        let slot = match self.slots.get(&index) {
            Some(&slot) => slot,
            None => {
                let slot = self.modules.len();
                self.modules
                    .push(ImportedModule::new(&self.headers[index], self.relative_require_path));
                self.slots.insert(index, slot);
                slot
            }
        };
        &self.modules[slot]
    }

    fn into_modules(self) -> Vec<ImportedModule> {
        self.modules
    }
}
