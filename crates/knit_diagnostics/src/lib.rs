//! Diagnostic creation, severity management, and rendering for link builds.
//!
//! Link problems are not tied to source spans: a [`Diagnostic`] names the
//! module it concerns instead. The thread-safe [`DiagnosticSink`] accumulates
//! diagnostics during a build, and [`DiagnosticRenderer`] implementations
//! format them for a terminal; `Diagnostic` itself serializes for JSON reports.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::{DiagnosticSink, Tally};
