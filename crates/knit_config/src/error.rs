//! Errors raised while reading `knit.toml`.

use std::path::PathBuf;

/// Why a `knit.toml` could not be turned into a [`ProjectConfig`](crate::ProjectConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("invalid knit.toml: {0}")]
    Parse(#[from] toml::de::Error),

    /// A module name that is not declared under `[[modules]]`.
    #[error("unknown module '{0}'")]
    UnknownModule(String),

    /// A required key is absent or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The module list breaks an ordering or naming rule.
    #[error("invalid module list: {0}")]
    ModuleList(String),
}
