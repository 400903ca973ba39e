//! Per-module cache records for incremental linking.
//!
//! Every module owns one cache directory holding its symbol header record,
//! its last generated code (and optional source map), and a fingerprint
//! manifest of its source files. Reads are fail-safe: a missing or corrupt
//! record is a cache miss, never an error. Writes replace whole files
//! atomically so a reader never observes a half-written record.

#![warn(missing_docs)]

pub mod error;
pub mod manifest;
pub mod output;
pub mod record;
pub mod store;

pub use error::CacheError;
pub use manifest::{ChangeSet, SourceManifest};
pub use output::GeneratedOutput;
pub use record::HeaderRecord;
pub use store::ModuleCache;
