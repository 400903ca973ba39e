//! Deciding which modules can reuse their cached output.
//!
//! The engine walks the ordered module list (main module last) and reloads
//! only modules whose symbol surface may have been affected by a change:
//!
//! 1. **Scan.** Modules without a cached header, or with changed sources, are
//!    loaded. Their definitions and imports feed the touched sets.
//! 2. **Main reconciliation.** A new module or a flipped export surface
//!    forces the main module to reload.
//! 3. **Forward propagation.** Modules defining a touched import are loaded.
//! 4. **Backward propagation.** Modules importing a touched definition are
//!    loaded.
//! 5. **Resolution.** Remaining modules reuse their cached output, or are
//!    loaded if none exists.
//!
//! Each direction is propagated exactly once, so a change that needs more
//! than two hops to reach a module is not detected.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use knit_cache::{GeneratedOutput, HeaderRecord};
use knit_common::Tag;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::artifact::ModuleArtifact;
use crate::error::LinkResult;
use crate::module::ModuleHeader;

/// Why a module was loaded instead of reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadReason {
    /// No readable header record was cached.
    NoCachedHeader,
    /// At least one source file changed.
    SourcesChanged,
    /// The main module must pick up a new or changed export surface.
    MainReconcile,
    /// Another module started or stopped importing one of its definitions.
    ExportsConsumed,
    /// One of its imports is defined differently now.
    ImportsChanged,
    /// The header was cached but the generated output was not.
    MissingOutput,
}

impl fmt::Display for ReloadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ReloadReason::NoCachedHeader => "no cached header",
            ReloadReason::SourcesChanged => "sources changed",
            ReloadReason::MainReconcile => "main module reconciliation",
            ReloadReason::ExportsConsumed => "exported symbols consumed elsewhere",
            ReloadReason::ImportsChanged => "imported symbols changed",
            ReloadReason::MissingOutput => "cached output missing",
        };
        f.write_str(text)
    }
}

/// Final state of one module after invalidation.
#[derive(Debug, Clone)]
pub struct CachedModule {
    /// Header used for linking.
    pub header: ModuleHeader,
    /// Cached output, present exactly when the module was not loaded.
    pub output: Option<GeneratedOutput>,
    /// Why the module was loaded, if it was.
    pub reload: Option<ReloadReason>,
    /// The cached record is missing or out of date and `header` must be
    /// committed once the build has succeeded.
    pub header_pending: bool,
}

impl CachedModule {
    /// Whether code must be generated for this module.
    pub fn is_dirty(&self) -> bool {
        self.header.is_loaded()
    }
}

/// Result of an invalidation run, in module order.
#[derive(Debug, Clone, Default)]
pub struct Invalidation {
    modules: Vec<CachedModule>,
}

impl Invalidation {
    /// All modules, main module last.
    pub fn modules(&self) -> &[CachedModule] {
        &self.modules
    }

    /// Headers of all modules, in order.
    pub fn headers(&self) -> Vec<ModuleHeader> {
        self.modules.iter().map(|m| m.header.clone()).collect()
    }

    /// Number of modules that need code generation.
    pub fn dirty_count(&self) -> usize {
        self.modules.iter().filter(|m| m.is_dirty()).count()
    }

    /// Commits every pending header record.
    ///
    /// Call only after all dirty modules were generated and their output
    /// committed: until then the old records must keep describing the old
    /// outputs, so a failed build is invalidated the same way on retry.
    pub fn commit_headers<A: ModuleArtifact>(&self, artifacts: &[A]) -> LinkResult<()> {
        for (module, artifact) in self.modules.iter().zip(artifacts) {
            if module.header_pending {
                artifact.commit_header(module.header.record())?;
            }
        }
        Ok(())
    }
}

/// Runs the invalidation steps over an ordered list of artifacts.
pub struct InvalidationEngine<'a, A> {
    artifacts: &'a [A],
}

impl<'a, A: ModuleArtifact> InvalidationEngine<'a, A> {
    /// Creates an engine over `artifacts`. The main module must be last.
    pub fn new(artifacts: &'a [A]) -> Self {
        Self { artifacts }
    }

    /// Determines, for every module, whether it is reused or reloaded.
    ///
    /// Nothing is written: fresh headers of modules with changed or missing
    /// records are marked pending, see [`Invalidation::commit_headers`].
    pub fn run(&self) -> LinkResult<Invalidation> {
        if self.artifacts.is_empty() {
            return Ok(Invalidation::default());
        }

        let prefetched: Vec<Option<HeaderRecord>> = self
            .artifacts
            .par_iter()
            .map(|artifact| artifact.fetch_header())
            .collect();

        let mut ctx = Context::new(self.artifacts);
        ctx.scan(prefetched)?;
        ctx.reconcile_main()?;
        ctx.propagate_forward()?;
        ctx.propagate_backward()?;
        let invalidation = ctx.resolve()?;

        info!(
            modules = self.artifacts.len(),
            dirty = invalidation.dirty_count(),
            "invalidation complete"
        );
        Ok(invalidation)
    }
}

/// Per-build state, owned by one run.
struct Context<'a, A> {
    artifacts: &'a [A],
    headers: Vec<ModuleHeader>,
    reasons: Vec<Option<ReloadReason>>,
    pending: Vec<bool>,
    touched_definitions: BTreeSet<Tag>,
    touched_imports: BTreeSet<Tag>,
    main_must_reload: bool,
}

impl<'a, A: ModuleArtifact> Context<'a, A> {
    fn new(artifacts: &'a [A]) -> Self {
        Self {
            artifacts,
            headers: Vec::with_capacity(artifacts.len()),
            reasons: vec![None; artifacts.len()],
            pending: vec![false; artifacts.len()],
            touched_definitions: BTreeSet::new(),
            touched_imports: BTreeSet::new(),
            main_must_reload: false,
        }
    }

    fn load(&self, index: usize, reason: ReloadReason) -> LinkResult<ModuleHeader> {
        let artifact = &self.artifacts[index];
        debug!(module = artifact.name(), %reason, "loading module");
        let module = artifact.load_module()?;
        Ok(Arc::new(module).make_header())
    }

    fn reload(&mut self, index: usize, reason: ReloadReason) -> LinkResult<&ModuleHeader> {
        let header = self.load(index, reason)?;
        self.headers[index] = header;
        self.reasons[index] = Some(reason);
        Ok(&self.headers[index])
    }

    fn scan(&mut self, prefetched: Vec<Option<HeaderRecord>>) -> LinkResult<()> {
        let artifacts = self.artifacts;
        for (index, cached) in prefetched.into_iter().enumerate() {
            let artifact = &artifacts[index];
            let header = match cached {
                None => {
                    let fresh = self.load(index, ReloadReason::NoCachedHeader)?;
                    self.main_must_reload = true;
                    self.touched_definitions
                        .extend(fresh.definitions().iter().cloned());
                    self.touched_imports
                        .extend(fresh.external_names().iter().cloned());
                    self.pending[index] = true;
                    self.reasons[index] = Some(ReloadReason::NoCachedHeader);
                    fresh
                }
                Some(record) if artifact.is_source_changed() => {
                    let fresh = self.load(index, ReloadReason::SourcesChanged)?;
                    if fresh.has_export_surface() != record.has_export_surface() {
                        debug!(module = artifact.name(), "export surface changed");
                        self.main_must_reload = true;
                    }
                    if fresh.definitions() != record.definitions() {
                        self.touched_definitions
                            .extend(record.definitions().iter().cloned());
                        self.touched_definitions
                            .extend(fresh.definitions().iter().cloned());
                    }
                    if fresh.external_names() != record.external_names() {
                        self.touched_imports
                            .extend(record.external_names().iter().cloned());
                        self.touched_imports
                            .extend(fresh.external_names().iter().cloned());
                    }
                    self.pending[index] = true;
                    self.reasons[index] = Some(ReloadReason::SourcesChanged);
                    fresh
                }
                Some(record) => {
                    ModuleHeader::cached(artifact.name(), artifact.external_name(), record)
                }
            };
            self.headers.push(header);
        }
        Ok(())
    }

    fn reconcile_main(&mut self) -> LinkResult<()> {
        let main = self.headers.len() - 1;
        if !self.main_must_reload || self.headers[main].is_loaded() {
            return Ok(());
        }
        let header = self.reload(main, ReloadReason::MainReconcile)?;
        let definitions = header.definitions().clone();
        let imports = header.external_names().clone();
        self.touched_definitions.extend(definitions);
        self.touched_imports.extend(imports);
        Ok(())
    }

    fn propagate_forward(&mut self) -> LinkResult<()> {
        for index in 0..self.headers.len() {
            let header = &self.headers[index];
            if header.is_loaded() || header.definitions().is_disjoint(&self.touched_imports) {
                continue;
            }
            let imports = self
                .reload(index, ReloadReason::ExportsConsumed)?
                .external_names()
                .clone();
            self.touched_imports.extend(imports);
        }
        Ok(())
    }

    fn propagate_backward(&mut self) -> LinkResult<()> {
        for index in 0..self.headers.len() {
            let header = &self.headers[index];
            if header.is_loaded() || header.external_names().is_disjoint(&self.touched_definitions) {
                continue;
            }
            self.reload(index, ReloadReason::ImportsChanged)?;
        }
        Ok(())
    }

    fn resolve(mut self) -> LinkResult<Invalidation> {
        let mut outputs = Vec::with_capacity(self.headers.len());
        for index in 0..self.headers.len() {
            let mut output = None;
            if !self.headers[index].is_loaded() {
                output = self.artifacts[index].fetch_output();
                if output.is_none() {
                    self.reload(index, ReloadReason::MissingOutput)?;
                }
            }
            outputs.push(output);
        }

        let modules = self
            .headers
            .into_iter()
            .zip(outputs)
            .zip(self.reasons)
            .zip(self.pending)
            .map(|(((header, output), reload), header_pending)| CachedModule {
                header,
                output,
                reload,
                header_pending,
            })
            .collect();
        Ok(Invalidation { modules })
    }
}
