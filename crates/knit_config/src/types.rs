//! Configuration types deserialized from `knit.toml`.

use serde::Deserialize;
use std::path::PathBuf;

/// The top-level project configuration parsed from `knit.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Output and cache settings.
    #[serde(default)]
    pub build: BuildConfig,
    /// Cross-module resolution policy.
    #[serde(default)]
    pub link: LinkConfig,
    /// Modules in dependency order; the main module comes last.
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

impl ProjectConfig {
    /// Returns the module declared as `project.main`, if present.
    pub fn main_module(&self) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.name == self.project.main)
    }

    /// Looks up a module entry by name.
    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.name == name)
    }
}

/// Project metadata required in every `knit.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    #[serde(default = "default_version")]
    pub version: String,
    /// Name of the entry module. Must be the last `[[modules]]` entry.
    pub main: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// How the final output is assembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// One bundle per module, rebuilt incrementally from the cache.
    #[default]
    Multi,
    /// A single merged bundle, always regenerated from every module.
    Single,
}

/// Module system used by generated bundles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// `require` / `module.exports`.
    #[default]
    CommonJs,
    /// `import` / `export`.
    Es,
}

impl ModuleKind {
    /// File extension for bundles of this kind.
    pub fn extension(self) -> &'static str {
        match self {
            ModuleKind::CommonJs => "js",
            ModuleKind::Es => "mjs",
        }
    }
}

/// Output and cache settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Single or multi-module output.
    pub mode: BuildMode,
    /// Module system of the generated code.
    pub module_kind: ModuleKind,
    /// Import sibling bundles through `./name.js` paths instead of bare names.
    pub relative_require_path: bool,
    /// Emit a source map next to every bundle.
    pub source_maps: bool,
    /// Directory receiving the generated bundles, relative to the project root.
    pub output_dir: PathBuf,
    /// Directory holding per-module cache records, relative to the project root.
    pub cache_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            mode: BuildMode::Multi,
            module_kind: ModuleKind::CommonJs,
            relative_require_path: true,
            source_maps: false,
            output_dir: PathBuf::from("build"),
            cache_dir: PathBuf::from(".knit-cache"),
        }
    }
}

/// What to do with an imported tag that no module defines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Report a warning and leave the reference unbound.
    #[default]
    Warn,
    /// Fail the build.
    Deny,
}

/// Cross-module resolution policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Handling of imports with no defining module.
    pub unresolved_imports: UnresolvedPolicy,
}

/// One module of the program.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    /// Internal module name; also the name of its cache subdirectory.
    pub name: String,
    /// Name used by other bundles to import this one. Defaults to `name`.
    #[serde(default)]
    pub external_name: Option<String>,
    /// Fragment files making up the module, relative to the project root.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
}

impl ModuleConfig {
    /// Returns the external name, falling back to the internal name.
    pub fn external_name(&self) -> &str {
        self.external_name.as_deref().unwrap_or(&self.name)
    }
}
