//! Reference JavaScript emitter.
//!
//! Wraps fragment code into a CommonJS or ES module: module imports first,
//! then import bindings, fragment declarations and host exports, the
//! cross-module export table, transitive re-exports, and finally the main
//! call. Fragments are emitted verbatim; no minification or renaming happens
//! here.

use std::collections::BTreeMap;
use std::fmt::Write;

use knit_cache::GeneratedOutput;
use knit_common::Tag;
use knit_config::ModuleKind;
use knit_link::{CodeGenerator, CrossModuleReferences, Fragment, GenerateRequest, LinkError, LinkResult};
use serde::Serialize;

/// Emits JavaScript bundles for the configured module system.
#[derive(Debug, Clone, Copy)]
pub struct JsEmitter {
    kind: ModuleKind,
    source_maps: bool,
}

impl JsEmitter {
    /// Creates an emitter.
    pub fn new(kind: ModuleKind, source_maps: bool) -> Self {
        Self { kind, source_maps }
    }

    /// File name of the bundle for `module_name`.
    pub fn file_name(&self, module_name: &str) -> String {
        format!("{module_name}.{}", self.kind.extension())
    }
}

/// Minimal source map listing the packages a bundle was built from.
#[derive(Serialize)]
struct SourceMap<'a> {
    version: u32,
    file: String,
    sources: Vec<&'a str>,
    names: Vec<&'a str>,
    mappings: &'a str,
}

impl CodeGenerator for JsEmitter {
    fn generate(&self, request: &GenerateRequest<'_>) -> LinkResult<GeneratedOutput> {
        let code = self.render(request).map_err(|e| LinkError::Codegen {
            module: request.module_name.to_string(),
            reason: e.to_string(),
        })?;
        let mut output = GeneratedOutput::new(code);

        if self.source_maps {
            let mut sources: Vec<&str> = request
                .fragments
                .iter()
                .map(|f| f.package.as_str())
                .filter(|p| !p.is_empty())
                .collect();
            sources.dedup();
            let map = SourceMap {
                version: 3,
                file: self.file_name(request.module_name),
                sources,
                names: Vec::new(),
                mappings: "",
            };
            let json = serde_json::to_string(&map).map_err(|e| LinkError::Codegen {
                module: request.module_name.to_string(),
                reason: e.to_string(),
            })?;
            output = output.with_source_map(json);
        }
        Ok(output)
    }
}

impl JsEmitter {
    fn render(&self, request: &GenerateRequest<'_>) -> Result<String, std::fmt::Error> {
        let es = self.kind == ModuleKind::Es;
        let ext = self.kind.extension();
        let mut out = String::new();

        writeln!(out, "// {}", request.module_name)?;
        if !es {
            writeln!(out, "'use strict';")?;
        }

        if let Some(refs) = request.references {
            for module in &refs.imported_modules {
                let specifier = module.specifier(ext);
                if es {
                    writeln!(out, "import * as {} from '{specifier}';", module.internal_name)?;
                } else {
                    writeln!(out, "var {} = require('{specifier}');", module.internal_name)?;
                }
            }
            for binding in refs.imports.values() {
                writeln!(
                    out,
                    "var {} = {}.{};",
                    binding.local_name, binding.module, binding.exported_name
                )?;
            }
        }

        for fragment in &request.fragments {
            push_block(&mut out, &fragment.declarations);
        }
        for fragment in &request.fragments {
            push_block(&mut out, &fragment.exports);
        }

        if let Some(refs) = request.references {
            let locals = local_names(&request.fragments);
            let exports = export_pairs(refs, &locals);
            if es {
                if !exports.is_empty() {
                    let list: Vec<String> = exports
                        .iter()
                        .map(|(public, local)| format!("{local} as {public}"))
                        .collect();
                    writeln!(out, "export {{ {} }};", list.join(", "))?;
                }
                for module in &refs.transitive_exports {
                    writeln!(out, "export * from '{}';", module.specifier(ext))?;
                }
            } else {
                for (public, local) in &exports {
                    writeln!(out, "module.exports.{public} = {local};")?;
                }
                for module in &refs.transitive_exports {
                    writeln!(out, "Object.assign(module.exports, {});", module.internal_name)?;
                }
            }
        }

        if request.call_main {
            for call in request.fragments.iter().filter_map(|f| f.main_call.as_deref()) {
                push_block(&mut out, call);
            }
        }
        Ok(out)
    }
}

fn push_block(out: &mut String, code: &str) {
    if code.trim().is_empty() {
        return;
    }
    out.push_str(code);
    if !code.ends_with('\n') {
        out.push('\n');
    }
}

fn local_names<'a>(fragments: &[&'a Fragment]) -> BTreeMap<&'a Tag, &'a str> {
    let mut names = BTreeMap::new();
    for &fragment in fragments {
        for (tag, name) in &fragment.name_bindings {
            names.insert(tag, name.as_str());
        }
    }
    names
}

/// `(public name, local name)` for every exported tag, in tag order.
fn export_pairs<'a>(
    refs: &'a CrossModuleReferences,
    locals: &BTreeMap<&Tag, &'a str>,
) -> Vec<(&'a str, &'a str)> {
    refs.exports
        .iter()
        .filter_map(|(tag, public)| locals.get(tag).map(|local| (public.as_str(), *local)))
        .collect()
}
