//! Shared foundational types used across the knit linking layer.
//!
//! Symbol [`Tag`]s, [`ContentHash`] fingerprints for change detection, and
//! the [`InternalError`] every crate reports broken invariants with.

#![warn(missing_docs)]

pub mod hash;
pub mod internal;
pub mod tag;

pub use hash::ContentHash;
pub use internal::InternalError;
pub use tag::Tag;
