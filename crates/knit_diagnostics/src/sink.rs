//! Collects the diagnostics of one link build.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Error and warning totals of a build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// Number of error diagnostics.
    pub errors: usize,
    /// Number of warning diagnostics.
    pub warnings: usize,
}

impl Tally {
    fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Note => {}
        }
    }

    /// Returns `true` if nothing worth reporting was emitted.
    pub fn is_clean(&self) -> bool {
        self.errors == 0 && self.warnings == 0
    }
}

#[derive(Default)]
struct Inner {
    diagnostics: Vec<Diagnostic>,
    tally: Tally,
}

/// Accumulates diagnostics from the assembler and the command driving it.
///
/// Shared by reference across rayon workers, so emission takes `&self`. The
/// tally survives [`take_all`](Self::take_all): draining the list for
/// rendering does not make a failed build look successful.
#[derive(Default)]
pub struct DiagnosticSink {
    inner: Mutex<Inner>,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic.
    pub fn emit(&self, diag: Diagnostic) {
        let mut inner = self.lock();
        inner.tally.record(diag.severity);
        inner.diagnostics.push(diag);
    }

    /// Returns `true` if any error was emitted.
    pub fn has_errors(&self) -> bool {
        self.lock().tally.errors > 0
    }

    /// Number of errors emitted so far.
    pub fn error_count(&self) -> usize {
        self.lock().tally.errors
    }

    /// Error and warning totals so far.
    pub fn tally(&self) -> Tally {
        self.lock().tally
    }

    /// Drains the diagnostics, leaving the tally in place.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.lock().diagnostics)
    }

    /// Snapshot of the diagnostics without draining.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().diagnostics.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
