//! Error types for linking and bundle assembly.

use knit_cache::CacheError;
use knit_common::{InternalError, Tag};
use knit_diagnostics::{Diagnostic, DiagnosticCode};

/// Result alias for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Fatal conditions that abort a build.
///
/// Cache misses never show up here; they are recovered by reloading the
/// module. Unresolved imports are reported separately and only become
/// [`LinkError::UnresolvedImports`] under a strict policy.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Two modules define the same tag.
    #[error("duplicate definition: {tag}")]
    DuplicateDefinition {
        /// The tag defined twice.
        tag: Tag,
        /// Module that defined it first.
        first: String,
        /// Module that defined it again.
        second: String,
    },

    /// An import was resolved against a module whose export names had not
    /// been assigned yet. Happens when a module redefines a symbol that one
    /// of its own dependencies also provides.
    #[error("cross module dependency resolution failed due to symbol '{namespace}' redefinition")]
    ExportOrder {
        /// Namespace prefix of the offending tag.
        namespace: String,
        /// Module whose import could not be resolved.
        module: String,
    },

    /// An exported tag has no local name to derive its export name from.
    #[error("internal error: name not found for tag {tag} in module `{module}`")]
    MissingNameBinding {
        /// Tag without a binding.
        tag: Tag,
        /// Module exporting it.
        module: String,
    },

    /// Imports without a defining module under the `deny` policy.
    #[error("{count} unresolved import(s)")]
    UnresolvedImports {
        /// Number of unresolved imports.
        count: usize,
    },

    /// A module could not be loaded.
    #[error("failed to load module `{module}`: {reason}")]
    Load {
        /// Module name.
        module: String,
        /// Description of the failure.
        reason: String,
    },

    /// The code generator failed for a module.
    #[error("code generation failed for module `{module}`: {reason}")]
    Codegen {
        /// Module name.
        module: String,
        /// Description of the failure.
        reason: String,
    },

    /// A cache record could not be written.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A broken invariant between the link phases.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl LinkError {
    /// Converts the error into a diagnostic for user-facing reporting.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            LinkError::DuplicateDefinition { tag, first, second } => {
                Diagnostic::error(DiagnosticCode::DUPLICATE_DEFINITION, self.to_string())
                    .in_module(second.clone())
                    .with_note(format!("`{tag}` is already defined by module `{first}`"))
            }
            LinkError::ExportOrder { module, .. } => {
                Diagnostic::error(DiagnosticCode::EXPORT_ORDER, self.to_string())
                    .in_module(module.clone())
                    .with_help("a module may only import symbols from modules listed before it")
            }
            LinkError::MissingNameBinding { module, .. } => {
                Diagnostic::error(DiagnosticCode::INTERNAL, self.to_string()).in_module(module.clone())
            }
            LinkError::UnresolvedImports { .. } => {
                Diagnostic::error(DiagnosticCode::UNRESOLVED_IMPORT_DENIED, self.to_string())
            }
            LinkError::Load { module, .. } | LinkError::Codegen { module, .. } => {
                Diagnostic::error(DiagnosticCode::MODULE_FAILED, self.to_string())
                    .in_module(module.clone())
            }
            LinkError::Cache(_) => Diagnostic::error(DiagnosticCode::CACHE_WRITE, self.to_string()),
            LinkError::Internal(e) => {
                let diag = Diagnostic::error(DiagnosticCode::INTERNAL, self.to_string());
                match &e.module {
                    Some(module) => diag.in_module(module.clone()),
                    None => diag,
                }
            }
        }
    }
}
