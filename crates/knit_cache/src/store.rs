//! One module's cache directory: header record and generated output.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::CacheError;
use crate::output::GeneratedOutput;
use crate::record::HeaderRecord;

/// File holding the binary [`HeaderRecord`].
const HEADER_FILE: &str = "module.header";

/// File holding the last generated code.
const CODE_FILE: &str = "module.js";

/// File holding the source map of the last generated code.
const SOURCE_MAP_FILE: &str = "module.js.map";

/// Cache location owned by a single module.
///
/// All side effects stay inside `dir`. Reads are fail-safe; every write
/// replaces its file atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCache {
    dir: PathBuf,
}

impl ModuleCache {
    /// Creates a cache handle rooted at `dir`. Nothing is touched on disk.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory this cache lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads the persisted header record.
    ///
    /// Returns `None` if the record is missing or does not decode.
    pub fn fetch_header(&self) -> Option<HeaderRecord> {
        let path = self.dir.join(HEADER_FILE);
        let bytes = std::fs::read(&path).ok()?;
        match HeaderRecord::decode(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "discarding unreadable header record");
                None
            }
        }
    }

    /// Persists `record`, replacing any previous one.
    pub fn commit_header(&self, record: &HeaderRecord) -> Result<(), CacheError> {
        let path = self.dir.join(HEADER_FILE);
        trace!(path = %path.display(), "committing header record");
        write_atomic(&path, &record.encode())
    }

    /// Reads previously generated code and its source map, if any.
    pub fn fetch_output(&self) -> Option<GeneratedOutput> {
        let code = std::fs::read_to_string(self.dir.join(CODE_FILE)).ok()?;
        let source_map = std::fs::read_to_string(self.dir.join(SOURCE_MAP_FILE)).ok();
        Some(GeneratedOutput { code, source_map })
    }

    /// Persists generated output.
    ///
    /// The old source map is removed before the code is replaced and the new
    /// map is written last, so an interrupted commit can leave code without a
    /// map but never code next to a map of different code.
    pub fn commit_output(&self, output: &GeneratedOutput) -> Result<(), CacheError> {
        let map_path = self.dir.join(SOURCE_MAP_FILE);
        match std::fs::remove_file(&map_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(CacheError::io(map_path, e)),
        }

        write_atomic(&self.dir.join(CODE_FILE), output.code.as_bytes())?;
        if let Some(map) = &output.source_map {
            write_atomic(&map_path, map.as_bytes())?;
        }
        Ok(())
    }

    /// Deletes the whole cache directory. A missing directory is not an error.
    pub fn clear(&self) -> Result<(), CacheError> {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(&self.dir, e)),
        }
    }
}

/// Writes `data` to a temporary sibling of `path`, then renames it into place.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CacheError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| CacheError::io(dir, e))?;
    tmp.write_all(data)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| CacheError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| CacheError::io(path, e.error))?;
    Ok(())
}
