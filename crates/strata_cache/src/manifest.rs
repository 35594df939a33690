//! Manifest of the artifacts in the cache after the last compile.
//!
//! The manifest is stored as `.strata-manifest.json` in the cache root. It is
//! a record for tooling and is never consulted to skip work: every production
//! build recompiles everything in scope.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_common::{BuildEnv, ContentHash};

use crate::error::CacheError;

/// Name of the manifest file within the cache root.
pub const MANIFEST_FILE: &str = ".strata-manifest.json";

/// Where a compiled unit's source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginKind {
    /// A file under a source root.
    Root,
    /// An entry inside an archive library.
    Archive,
}

/// One artifact written during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Origin of the unit's source.
    pub origin: OriginKind,
    /// Source file path, or `archive!entry` for archive units.
    pub source: String,
    /// Checksum of the artifact bytes.
    pub checksum: ContentHash,
}

/// Record of every artifact produced by one `run_compile`, keyed by logical path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    /// Strata version that produced the build.
    pub strata_version: String,
    /// Environment the build ran for.
    pub env: BuildEnv,
    /// Artifacts keyed by the unit's logical path.
    pub units: BTreeMap<String, ArtifactRecord>,
}

impl BuildManifest {
    /// Creates an empty manifest.
    pub fn new(strata_version: &str, env: BuildEnv) -> Self {
        Self {
            strata_version: strata_version.to_string(),
            env,
            units: BTreeMap::new(),
        }
    }

    /// Records an artifact, replacing any earlier record for the same unit.
    pub fn record(&mut self, logical: &str, record: ArtifactRecord) {
        self.units.insert(logical.to_string(), record);
    }

    /// Copies the records of `previous` that this manifest lacks and `keep`
    /// accepts. Returns how many were copied.
    ///
    /// Artifacts left in place from an earlier build stay described after a
    /// build that did not rewrite them.
    pub fn carry_over<F>(&mut self, previous: BuildManifest, mut keep: F) -> usize
    where
        F: FnMut(&str, &ArtifactRecord) -> bool,
    {
        let mut copied = 0;
        for (logical, record) in previous.units {
            if self.units.contains_key(&logical) || !keep(&logical, &record) {
                continue;
            }
            self.units.insert(logical, record);
            copied += 1;
        }
        copied
    }

    /// Returns the logical paths of every recorded unit, sorted.
    pub fn logical_paths(&self) -> Vec<&str> {
        self.units.keys().map(String::as_str).collect()
    }

    /// Loads the manifest from the cache root.
    ///
    /// Returns `Ok(None)` if no manifest has been written yet.
    pub fn load(cache_dir: &Path) -> Result<Option<Self>, CacheError> {
        let path = cache_dir.join(MANIFEST_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| CacheError::ManifestParse {
                reason: e.to_string(),
            })
    }

    /// Saves the manifest to the cache root, creating it if needed.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(cache_dir).map_err(|e| CacheError::io(cache_dir, e))?;
        let path = cache_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| CacheError::io(path, e))
    }
}
