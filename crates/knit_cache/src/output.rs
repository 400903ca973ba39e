//! Generated code as persisted between builds.

/// The code generated for one module, plus its optional source map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneratedOutput {
    /// Generated code text.
    pub code: String,
    /// Source map text, if one was produced.
    pub source_map: Option<String>,
}

impl GeneratedOutput {
    /// Creates output without a source map.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            source_map: None,
        }
    }

    /// Attaches a source map.
    pub fn with_source_map(mut self, source_map: impl Into<String>) -> Self {
        self.source_map = Some(source_map.into());
        self
    }
}
