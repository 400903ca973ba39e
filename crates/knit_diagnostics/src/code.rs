//! Stable codes for every diagnostic the linker can produce.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which family a code belongs to; decides its letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Fatal link errors, prefixed with `E`.
    Error,
    /// Link warnings, prefixed with `W`.
    Warning,
    /// Cache maintenance notices, prefixed with `C`.
    Cache,
    /// Internal invariant violations, prefixed with `I`.
    Internal,
}

impl Category {
    /// `E`, `W`, `C` or `I`.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Cache => 'C',
            Category::Internal => 'I',
        }
    }
}

/// A code such as `E201`: category letter plus a three-digit number.
///
/// Codes are stable across releases so scripts can match on them in JSON
/// build reports.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// Family.
    pub category: Category,
    /// Number within the family.
    pub number: u16,
}

impl DiagnosticCode {
    /// Two modules define the same tag.
    pub const DUPLICATE_DEFINITION: Self = Self::new(Category::Error, 201);
    /// An import was resolved against a module whose export names were not yet assigned.
    pub const EXPORT_ORDER: Self = Self::new(Category::Error, 202);
    /// An imported tag has no defining module (strict policy).
    pub const UNRESOLVED_IMPORT_DENIED: Self = Self::new(Category::Error, 203);
    /// A module could not be loaded or generated.
    pub const MODULE_FAILED: Self = Self::new(Category::Error, 204);
    /// An imported tag has no defining module.
    pub const UNRESOLVED_IMPORT: Self = Self::new(Category::Warning, 201);
    /// A cache record could not be written.
    pub const CACHE_WRITE: Self = Self::new(Category::Cache, 101);
    /// A broken internal invariant.
    pub const INTERNAL: Self = Self::new(Category::Internal, 1);

    /// Builds a code from its category and number.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
