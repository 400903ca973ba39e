//! How serious a link diagnostic is.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a [`Diagnostic`](crate::Diagnostic).
///
/// Only [`Error`](Severity::Error) fails a build. Variants are declared from
/// least to most severe so `max()` over a build's diagnostics gives its
/// overall outcome.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Context only, e.g. a cache record that had to be rebuilt.
    Note,
    /// The bundle was written but may misbehave at run time.
    Warning,
    /// Nothing was written.
    Error,
}

impl Severity {
    /// Returns `true` if this severity fails the build.
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }

    /// Lowercase label used in rendered headers and JSON.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// SGR color code for terminal output.
    pub(crate) fn ansi_color(self) -> &'static str {
        match self {
            Severity::Note => "36",
            Severity::Warning => "33",
            Severity::Error => "31",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_severity_wins() {
        let seen = [Severity::Warning, Severity::Note, Severity::Error, Severity::Warning];
        assert_eq!(seen.iter().copied().max(), Some(Severity::Error));
        assert!(Severity::Note < Severity::Warning);
    }

    #[test]
    fn only_errors_fail() {
        assert!(Severity::Error.is_error());
        assert!(!Severity::Warning.is_error());
        assert!(!Severity::Note.is_error());
    }

    #[test]
    fn label_matches_serde_name() {
        for severity in [Severity::Note, Severity::Warning, Severity::Error] {
            let json = serde_json::to_string(&severity).unwrap();
            assert_eq!(json, format!("\"{}\"", severity.label()));
            assert_eq!(severity.to_string(), severity.label());
        }
    }
}
