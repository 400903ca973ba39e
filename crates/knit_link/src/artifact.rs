//! Collaborator traits describing the modules of a build.
//!
//! The linker never reads sources itself. Callers describe each module with a
//! [`ModuleArtifact`], which knows where the module's cache lives, whether any
//! of its sources changed, and how to load the module into memory.

use std::path::Path;

use knit_cache::{GeneratedOutput, HeaderRecord, ModuleCache};

use crate::error::LinkResult;
use crate::module::LoadedModule;

/// One source file of a module.
pub trait SourceArtifact {
    /// Path of the source file.
    fn path(&self) -> &Path;

    /// Whether the file changed since the last successful build.
    fn is_changed(&self) -> bool;
}

/// Stable handle on one module of the build.
///
/// The provided methods route cache access through [`ModuleArtifact::cache`];
/// an artifact without a cache location misses on every fetch and ignores
/// every commit.
pub trait ModuleArtifact: Sync {
    /// Source file type.
    type Source: SourceArtifact;

    /// Internal module name.
    fn name(&self) -> &str;

    /// Name other bundles import this module by.
    fn external_name(&self) -> &str {
        self.name()
    }

    /// Cache location owned by this module, if any.
    fn cache(&self) -> Option<&ModuleCache>;

    /// Source files making up the module.
    fn sources(&self) -> &[Self::Source];

    /// Loads the module into memory.
    fn load_module(&self) -> LinkResult<LoadedModule>;

    /// Whether any source file changed.
    fn is_source_changed(&self) -> bool {
        self.sources().iter().any(SourceArtifact::is_changed)
    }

    /// Reads the cached header record, `None` on any miss.
    fn fetch_header(&self) -> Option<HeaderRecord> {
        self.cache()?.fetch_header()
    }

    /// Persists a header record.
    fn commit_header(&self, record: &HeaderRecord) -> LinkResult<()> {
        match self.cache() {
            Some(cache) => Ok(cache.commit_header(record)?),
            None => Ok(()),
        }
    }

    /// Reads the cached generated output, `None` on any miss.
    fn fetch_output(&self) -> Option<GeneratedOutput> {
        self.cache()?.fetch_output()
    }

    /// Persists generated output.
    fn commit_output(&self, output: &GeneratedOutput) -> LinkResult<()> {
        match self.cache() {
            Some(cache) => Ok(cache.commit_output(output)?),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct File {
        path: PathBuf,
        changed: bool,
    }

    impl SourceArtifact for File {
        fn path(&self) -> &Path {
            &self.path
        }

        fn is_changed(&self) -> bool {
            self.changed
        }
    }

    struct Uncached {
        sources: Vec<File>,
    }

    impl ModuleArtifact for Uncached {
        type Source = File;

        fn name(&self) -> &str {
            "m"
        }

        fn cache(&self) -> Option<&ModuleCache> {
            None
        }

        fn sources(&self) -> &[File] {
            &self.sources
        }

        fn load_module(&self) -> LinkResult<LoadedModule> {
            Ok(LoadedModule {
                name: self.name().to_string(),
                external_name: self.external_name().to_string(),
                fragments: Vec::new(),
            })
        }
    }

    fn file(name: &str, changed: bool) -> File {
        File {
            path: PathBuf::from(name),
            changed,
        }
    }

    #[test]
    fn any_changed_source_marks_module_changed() {
        let clean = Uncached {
            sources: vec![file("a", false), file("b", false)],
        };
        assert!(!clean.is_source_changed());
        let dirty = Uncached {
            sources: vec![file("a", false), file("b", true)],
        };
        assert!(dirty.is_source_changed());
        assert_eq!(dirty.sources()[1].path(), Path::new("b"));
    }

    #[test]
    fn external_name_defaults_to_name() {
        let m = Uncached { sources: vec![] };
        assert_eq!(m.external_name(), "m");
    }

    #[test]
    fn missing_cache_location_misses_and_ignores_commits() {
        let m = Uncached { sources: vec![] };
        m.commit_header(&HeaderRecord::default()).unwrap();
        m.commit_output(&GeneratedOutput::new("x")).unwrap();
        assert!(m.fetch_header().is_none());
        assert!(m.fetch_output().is_none());
    }
}
