//! Driving invalidation, resolution, and code generation to final bundles.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use knit_cache::GeneratedOutput;
use knit_common::{InternalError, Tag};
use knit_config::{BuildMode, ProjectConfig, UnresolvedPolicy};
use knit_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use tracing::{debug, info};

use crate::artifact::ModuleArtifact;
use crate::error::{LinkError, LinkResult};
use crate::invalidate::{InvalidationEngine, ReloadReason};
use crate::module::{Fragment, LoadedModule};
use crate::resolve::{CrossModuleReferences, CrossModuleResolver, UnresolvedImport};

/// Everything the code generator needs for one bundle.
#[derive(Debug, Clone)]
pub struct GenerateRequest<'a> {
    /// Name of the bundle being generated.
    pub module_name: &'a str,
    /// Fragments to emit, in order.
    pub fragments: Vec<&'a Fragment>,
    /// Cross-module wiring; `None` for a single merged bundle.
    pub references: Option<&'a CrossModuleReferences>,
    /// Whether to emit the entry-point invocation.
    pub call_main: bool,
}

/// Produces code for one bundle.
pub trait CodeGenerator {
    /// Generates the bundle described by `request`.
    fn generate(&self, request: &GenerateRequest<'_>) -> LinkResult<GeneratedOutput>;
}

/// Settings for one assembly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Single merged bundle or one bundle per module.
    pub mode: BuildMode,
    /// Whether import specifiers are relative paths.
    pub relative_require_path: bool,
    /// Handling of imports no module defines.
    pub unresolved_imports: UnresolvedPolicy,
}

impl AssembleOptions {
    /// Reads the options from a project configuration.
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            mode: config.build.mode,
            relative_require_path: config.build.relative_require_path,
            unresolved_imports: config.link.unresolved_imports,
        }
    }
}

/// Bundles produced by one assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleOutput {
    /// The main bundle.
    pub main: GeneratedOutput,
    /// Other bundles as `(external name, output)`, in module order.
    pub dependencies: Vec<(String, GeneratedOutput)>,
    /// Modules whose code was generated in this build.
    pub regenerated: Vec<String>,
    /// Modules whose cached output was reused.
    pub reused: Vec<String>,
    /// Why each regenerated module was reloaded. Empty in single mode.
    pub reload_reasons: BTreeMap<String, ReloadReason>,
}

/// Assembles bundles from an ordered module list.
pub struct BundleAssembler<'a, G> {
    options: AssembleOptions,
    generator: &'a G,
    sink: &'a DiagnosticSink,
}

impl<'a, G: CodeGenerator> BundleAssembler<'a, G> {
    /// Creates an assembler. Unresolved imports are reported into `sink`.
    pub fn new(options: AssembleOptions, generator: &'a G, sink: &'a DiagnosticSink) -> Self {
        Self {
            options,
            generator,
            sink,
        }
    }

    /// Builds the bundles for `artifacts`, main module last.
    pub fn build<A: ModuleArtifact>(&self, artifacts: &[A]) -> LinkResult<BundleOutput> {
        if artifacts.is_empty() {
            return Err(InternalError::new("no modules to assemble").into());
        }
        let output = match self.options.mode {
            BuildMode::Multi => self.build_multi(artifacts)?,
            BuildMode::Single => self.build_single(artifacts)?,
        };
        info!(
            regenerated = output.regenerated.len(),
            reused = output.reused.len(),
            "bundles assembled"
        );
        Ok(output)
    }

    fn build_multi<A: ModuleArtifact>(&self, artifacts: &[A]) -> LinkResult<BundleOutput> {
        let invalidation = InvalidationEngine::new(artifacts).run()?;
        let headers = invalidation.headers();
        let link = CrossModuleResolver::new(&headers, self.options.relative_require_path).resolve()?;
        self.report_unresolved(&link.unresolved)?;

        let main_index = artifacts.len() - 1;
        let mut bundle = BundleOutput::default();
        for (index, (cached, references)) in invalidation
            .modules()
            .iter()
            .zip(&link.references)
            .enumerate()
        {
            let is_main = index == main_index;
            let header = &cached.header;
            let name = if is_main {
                header.name()
            } else {
                header.external_name()
            };

            let output = match header.module() {
                Some(module) => {
                    let references = references.as_ref().ok_or_else(|| {
                        InternalError::in_module(name, "cannot find cross references")
                    })?;
                    debug!(module = name, "generating module");
                    let output = self.generator.generate(&GenerateRequest {
                        module_name: name,
                        fragments: module.fragments.iter().collect(),
                        references: Some(references),
                        call_main: is_main,
                    })?;
                    artifacts[index].commit_output(&output)?;
                    if let Some(reason) = cached.reload {
                        bundle.reload_reasons.insert(header.name().to_string(), reason);
                    }
                    bundle.regenerated.push(header.name().to_string());
                    output
                }
                None => {
                    let output = cached.output.clone().ok_or_else(|| {
                        InternalError::in_module(name, "cannot find cached output")
                    })?;
                    bundle.reused.push(header.name().to_string());
                    output
                }
            };

            if is_main {
                bundle.main = output;
            } else {
                bundle.dependencies.push((name.to_string(), output));
            }
        }
        invalidation.commit_headers(artifacts)?;
        Ok(bundle)
    }

    fn build_single<A: ModuleArtifact>(&self, artifacts: &[A]) -> LinkResult<BundleOutput> {
        let modules = artifacts
            .iter()
            .map(|artifact| artifact.load_module())
            .collect::<LinkResult<Vec<LoadedModule>>>()?;
        self.report_unresolved(&merged_unresolved(&modules))?;

        let main_name = artifacts[artifacts.len() - 1].name();
        let fragments = modules.iter().flat_map(|m| m.fragments.iter()).collect();
        let main = self.generator.generate(&GenerateRequest {
            module_name: main_name,
            fragments,
            references: None,
            call_main: true,
        })?;

        Ok(BundleOutput {
            main,
            dependencies: Vec::new(),
            regenerated: modules.into_iter().map(|m| m.name).collect(),
            ..BundleOutput::default()
        })
    }

    fn report_unresolved(&self, unresolved: &[UnresolvedImport]) -> LinkResult<()> {
        let deny = self.options.unresolved_imports == UnresolvedPolicy::Deny;
        for import in unresolved {
            let message = format!("unresolved import `{}`", import.tag);
            let diag = if deny {
                Diagnostic::error(DiagnosticCode::UNRESOLVED_IMPORT_DENIED, message)
            } else {
                Diagnostic::warning(DiagnosticCode::UNRESOLVED_IMPORT, message)
            };
            self.sink.emit(
                diag.in_module(import.module.clone())
                    .with_note("no module in the build defines this symbol"),
            );
        }
        if deny && !unresolved.is_empty() {
            return Err(LinkError::UnresolvedImports {
                count: unresolved.len(),
            });
        }
        Ok(())
    }
}

/// Imports left unbound when all modules are merged into one bundle.
fn merged_unresolved(modules: &[LoadedModule]) -> Vec<UnresolvedImport> {
    let headers: Vec<_> = modules
        .iter()
        .map(|m| Arc::new(m.clone()).make_header())
        .collect();
    let defined: BTreeSet<&Tag> = headers.iter().flat_map(|h| h.definitions()).collect();
    let mut unresolved = Vec::new();
    for header in &headers {
        for tag in header.external_names() {
            if !defined.contains(tag) {
                unresolved.push(UnresolvedImport {
                    module: header.name().to_string(),
                    tag: tag.clone(),
                });
            }
        }
    }
    unresolved
}
