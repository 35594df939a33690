//! Artifact storage mirroring source-relative paths.
//!
//! A unit with logical path `app/forms/Main` is cached at
//! `<cache_dir>/app/forms/Main.<artifact_ext>`. Artifacts are raw compiler
//! output with no header: the cache root is what gets deployed and the runtime
//! loads these files directly.

use std::path::{Path, PathBuf};

use strata_common::UnitIdentity;
use walkdir::WalkDir;

use crate::error::CacheError;
use crate::ignore::{CacheIgnoreList, IGNORE_FILE};
use crate::manifest::MANIFEST_FILE;

/// Writes artifact bytes to `path`, creating parent directories as needed.
pub fn write_artifact_file(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
    }
    std::fs::write(path, bytes).map_err(|e| CacheError::io(path, e))
}

/// The artifact cache rooted at one directory.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    /// Root directory for artifacts, the ignore-list and the manifest.
    cache_dir: PathBuf,

    /// Extension of artifact files, without the dot.
    artifact_ext: String,
}

impl ArtifactCache {
    /// Creates a cache rooted at `cache_dir`. Nothing is touched on disk.
    pub fn new(cache_dir: &Path, artifact_ext: &str) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
            artifact_ext: artifact_ext.to_string(),
        }
    }

    /// Returns the cache root.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the artifact extension.
    pub fn artifact_ext(&self) -> &str {
        &self.artifact_ext
    }

    /// Creates the cache root if it does not exist.
    pub fn ensure_root(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.cache_dir).map_err(|e| CacheError::io(&self.cache_dir, e))
    }

    /// Returns the artifact path for a unit.
    pub fn artifact_path(&self, unit: &UnitIdentity) -> PathBuf {
        let mut path = self.cache_dir.clone();
        let mut segments = unit.segments().peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_some() {
                path.push(segment);
            } else {
                path.push(format!("{segment}.{}", self.artifact_ext));
            }
        }
        path
    }

    /// Deletes the cached artifact for a unit.
    ///
    /// Returns `Ok(false)` if there was nothing to delete.
    pub fn invalidate(&self, unit: &UnitIdentity) -> Result<bool, CacheError> {
        let path = self.artifact_path(unit);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    /// Writes a unit's compiled bytes and returns the artifact path.
    pub fn store(&self, unit: &UnitIdentity, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        let path = self.artifact_path(unit);
        write_artifact_file(&path, bytes)?;
        Ok(path)
    }

    /// Returns `true` if an artifact exists for the unit.
    pub fn contains(&self, unit: &UnitIdentity) -> bool {
        self.artifact_path(unit).is_file()
    }

    /// Reads a unit's artifact bytes, or `None` if absent or unreadable.
    pub fn read(&self, unit: &UnitIdentity) -> Option<Vec<u8>> {
        std::fs::read(self.artifact_path(unit)).ok()
    }

    /// Returns the path of the ignore-list file.
    pub fn ignore_list_path(&self) -> PathBuf {
        self.cache_dir.join(IGNORE_FILE)
    }

    /// Persists the ignore-list, overwriting any previous one.
    pub fn write_ignore_list(&self, list: &CacheIgnoreList) -> Result<PathBuf, CacheError> {
        self.ensure_root()?;
        let path = self.ignore_list_path();
        std::fs::write(&path, list.to_file_contents()).map_err(|e| CacheError::io(&path, e))?;
        Ok(path)
    }

    /// Reads the persisted ignore-list, or `None` if none has been written.
    pub fn read_ignore_list(&self) -> Option<CacheIgnoreList> {
        std::fs::read_to_string(self.ignore_list_path())
            .ok()
            .map(|c| CacheIgnoreList::parse(&c))
    }

    /// Returns the logical paths of every artifact under the cache root, sorted.
    pub fn list_artifacts(&self) -> Result<Vec<String>, CacheError> {
        let mut out = Vec::new();
        for path in self.artifact_files()? {
            if let Ok(rel) = path.strip_prefix(&self.cache_dir) {
                let rel = rel.with_extension("");
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
        out.sort();
        Ok(out)
    }

    /// Removes every artifact, the ignore-list and the manifest.
    ///
    /// Other files under the cache root are left alone, since the root may
    /// double as the generated-source directory. Returns the number of
    /// artifacts removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let artifacts = self.artifact_files()?;
        for path in &artifacts {
            std::fs::remove_file(path).map_err(|e| CacheError::io(path, e))?;
        }
        for name in [IGNORE_FILE, MANIFEST_FILE] {
            let path = self.cache_dir.join(name);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::io(path, e)),
            }
        }
        tracing::debug!(
            removed = artifacts.len(),
            cache = %self.cache_dir.display(),
            "cleared artifact cache"
        );
        Ok(artifacts.len())
    }

    fn artifact_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        if !self.cache_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.cache_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.cache_dir.clone());
                CacheError::io(path, e.into())
            })?;
            let is_artifact = entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(&self.artifact_ext));
            if is_artifact {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}
