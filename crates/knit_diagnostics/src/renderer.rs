//! Human-readable rendering of diagnostics.
//!
//! JSON reports serialize [`Diagnostic`] directly.

use crate::diagnostic::Diagnostic;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// warning[W201]: unresolved import
///   --> module `app`
///    = note: ...
///    = help: ...
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, diag: &Diagnostic, text: String) -> String {
        if !self.color {
            return text;
        }
        format!("\x1b[1;{}m{text}\x1b[0m", diag.severity.ansi_color())
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = String::new();

        let header = self.paint(diag, format!("{}[{}]", diag.severity, diag.code));
        out.push_str(&format!("{header}: {}\n", diag.message));

        if let Some(module) = &diag.module {
            out.push_str(&format!("  --> module `{module}`\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::DiagnosticCode;

    #[test]
    fn render_warning_with_module_and_notes() {
        let diag = Diagnostic::warning(DiagnosticCode::UNRESOLVED_IMPORT, "unresolved import")
            .in_module("app")
            .with_note("tag `lib|gone` has no defining module")
            .with_help("check the module order in knit.toml");

        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.contains("warning[W201]: unresolved import"));
        assert!(output.contains("--> module `app`"));
        assert!(output.contains("= note: tag `lib|gone` has no defining module"));
        assert!(output.contains("= help: check the module order in knit.toml"));
    }

    #[test]
    fn render_without_module_has_no_location() {
        let diag = Diagnostic::error(DiagnosticCode::INTERNAL, "general error");
        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.contains("error[I001]: general error"));
        assert!(!output.contains("-->"));
    }

    #[test]
    fn color_wraps_header_only() {
        let diag = Diagnostic::error(DiagnosticCode::DUPLICATE_DEFINITION, "dup");
        let output = TerminalRenderer::new(true).render(&diag);
        assert!(output.starts_with("\x1b[1;31merror[E201]\x1b[0m: dup"));
    }
}
