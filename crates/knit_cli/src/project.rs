//! Project discovery and file-backed module artifacts.
//!
//! Each module's sources are JSON fragment files. Change detection compares
//! fresh content hashes against the module's `sources.json` manifest from the
//! last successful build.

use std::path::{Path, PathBuf};

use knit_cache::{ModuleCache, SourceManifest};
use knit_config::{ModuleConfig, ProjectConfig, CONFIG_FILE};
use knit_link::{Fragment, LinkError, LinkResult, LoadedModule, ModuleArtifact, SourceArtifact};
use tracing::debug;

use crate::GlobalArgs;

/// Version recorded in source manifests. A different version invalidates them.
pub const KNIT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Walks up from `start` looking for the nearest directory containing `knit.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `knit.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match &global.config {
        Some(config_path) => {
            let p = PathBuf::from(config_path);
            if p.is_file() {
                Ok(p.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")))
            } else {
                Ok(p)
            }
        }
        None => find_project_root(&std::env::current_dir()?),
    }
}

/// Cache directory of one module.
pub fn module_cache_dir(project_dir: &Path, config: &ProjectConfig, module: &str) -> PathBuf {
    project_dir.join(&config.build.cache_dir).join(module)
}

/// One fragment file of a module.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    changed: bool,
}

impl SourceArtifact for FileSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_changed(&self) -> bool {
        self.changed
    }
}

/// A module whose sources are fragment files on disk.
#[derive(Debug)]
pub struct FileModuleArtifact {
    name: String,
    external_name: String,
    cache: ModuleCache,
    sources: Vec<FileSource>,
    sources_removed: bool,
    manifest: SourceManifest,
}

impl FileModuleArtifact {
    /// Hashes the module's sources and compares them with the last manifest.
    pub fn open(project_dir: &Path, config: &ProjectConfig, module: &ModuleConfig) -> Self {
        let cache = ModuleCache::new(module_cache_dir(project_dir, config, &module.name));
        let paths: Vec<PathBuf> = module.sources.iter().map(|s| project_dir.join(s)).collect();
        let manifest = SourceManifest::capture(KNIT_VERSION, &paths);

        // Without a usable previous manifest every source counts as changed.
        let changes = SourceManifest::load(cache.dir())
            .filter(|m| m.is_compatible(KNIT_VERSION))
            .map(|previous| previous.detect_changes(&manifest));
        let sources_removed = changes
            .as_ref()
            .is_some_and(|c| !c.deleted_files.is_empty());

        let sources = paths
            .into_iter()
            .map(|path| FileSource {
                changed: changes.as_ref().map_or(true, |c| c.is_dirty(&path))
                    || !manifest.files.contains_key(&path),
                path,
            })
            .collect::<Vec<_>>();
        debug!(
            module = %module.name,
            changed = sources.iter().filter(|s| s.changed).count(),
            sources_removed,
            "scanned sources"
        );

        Self {
            name: module.name.clone(),
            external_name: module.external_name().to_string(),
            cache,
            sources,
            sources_removed,
            manifest,
        }
    }

    /// Records the current source hashes for the next build.
    pub fn save_manifest(&self) -> Result<(), knit_cache::CacheError> {
        self.manifest.save(self.cache.dir())
    }
}

impl ModuleArtifact for FileModuleArtifact {
    type Source = FileSource;

    fn name(&self) -> &str {
        &self.name
    }

    fn external_name(&self) -> &str {
        &self.external_name
    }

    fn cache(&self) -> Option<&ModuleCache> {
        Some(&self.cache)
    }

    fn sources(&self) -> &[FileSource] {
        &self.sources
    }

    fn is_source_changed(&self) -> bool {
        self.sources_removed || self.sources.iter().any(SourceArtifact::is_changed)
    }

    fn load_module(&self) -> LinkResult<LoadedModule> {
        let fragments = self
            .sources
            .iter()
            .map(|source| read_fragment(&self.name, &source.path))
            .collect::<LinkResult<Vec<_>>>()?;
        Ok(LoadedModule {
            name: self.name.clone(),
            external_name: self.external_name.clone(),
            fragments,
        })
    }
}

fn read_fragment(module: &str, path: &Path) -> LinkResult<Fragment> {
    let load_error = |reason: String| LinkError::Load {
        module: module.to_string(),
        reason: format!("{}: {reason}", path.display()),
    };
    let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| load_error(e.to_string()))
}

/// Opens every configured module, in configuration order.
pub fn open_artifacts(project_dir: &Path, config: &ProjectConfig) -> Vec<FileModuleArtifact> {
    config
        .modules
        .iter()
        .map(|module| FileModuleArtifact::open(project_dir, config, module))
        .collect()
}
