//! Broken-invariant errors shared by every knit crate.

use std::fmt;

/// A violated internal invariant, as opposed to a problem in the user's
/// modules or configuration.
///
/// Reaching one means knit itself, or a collaborator feeding it inconsistent
/// data, is at fault. The optional module names where it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalError {
    /// What went wrong.
    pub message: String,
    /// Module being processed when the invariant broke.
    pub module: Option<String>,
}

impl InternalError {
    /// Creates an error not tied to any module.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            module: None,
        }
    }

    /// Creates an error detected while processing `module`.
    pub fn in_module(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            module: Some(module.into()),
        }
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module {
            Some(module) => write!(f, "internal error in module {module}: {}", self.message),
            None => write!(f, "internal error: {}", self.message),
        }
    }
}

impl std::error::Error for InternalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_module() {
        let err = InternalError::new("no modules to assemble");
        assert_eq!(err.to_string(), "internal error: no modules to assemble");
    }

    #[test]
    fn display_with_module() {
        let err = InternalError::in_module("lib", "cached output vanished");
        assert_eq!(
            err.to_string(),
            "internal error in module lib: cached output vanished"
        );
        assert_eq!(err.module.as_deref(), Some("lib"));
    }
}
