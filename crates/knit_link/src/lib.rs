//! Incremental multi-module linking.
//!
//! Given modules in dependency order (entry module last), this crate decides
//! which modules can reuse their cached output and which must be regenerated
//! ([`invalidate`]), wires cross-module symbol references into deterministic
//! imports and exports ([`resolve`]), and drives an external code generator
//! to produce the final bundles ([`assemble`]).

#![warn(missing_docs)]

pub mod artifact;
pub mod assemble;
pub mod error;
pub mod invalidate;
pub mod module;
pub mod resolve;
pub mod sanitize;

pub use artifact::{ModuleArtifact, SourceArtifact};
pub use assemble::{AssembleOptions, BundleAssembler, BundleOutput, CodeGenerator, GenerateRequest};
pub use error::{LinkError, LinkResult};
pub use invalidate::{CachedModule, Invalidation, InvalidationEngine, ReloadReason};
pub use module::{Fragment, LoadedModule, ModuleHeader};
pub use resolve::{
    CrossModuleReferences, CrossModuleResolver, ImportBinding, ImportedModule, LinkOutput,
    UnresolvedImport,
};
pub use sanitize::sanitize_name;
