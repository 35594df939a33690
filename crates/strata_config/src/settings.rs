//! Persisted key-value build settings.
//!
//! Settings are toggled by the user between builds (for example from an IDE
//! settings pane) and read once at build start. They live outside
//! `strata.toml` so flipping a checkbox never rewrites the project file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::ConfigError;

/// Key of the boolean that enables compiling to the artifact cache.
pub const COMPILE_TO_CACHE: &str = "compile_to_cache";

/// Key-value persistence for build settings.
pub trait SettingsStore: Send + Sync {
    /// Returns the boolean stored under `key`, or `None` if unset.
    fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_bool(&self, key: &str, value: bool) -> Result<(), ConfigError>;

    /// Returns whether production builds compile to the artifact cache.
    ///
    /// Unset means disabled.
    fn compile_to_cache(&self) -> Result<bool, ConfigError> {
        Ok(self.get_bool(COMPILE_TO_CACHE)?.unwrap_or(false))
    }
}

/// A [`SettingsStore`] backed by a TOML table on disk.
///
/// Every read goes to disk so a value written by another process (the
/// settings UI) is seen by the next build.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    /// Creates a store persisting to `path`. The file need not exist yet.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<toml::Table, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => toml::from_str::<toml::Table>(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(toml::Table::new()),
            Err(e) => Err(ConfigError::IoError(e)),
        }
    }

    fn write_table(&self, table: &toml::Table) -> Result<(), ConfigError> {
        let write_err = |reason: String| ConfigError::SettingsWrite {
            path: self.path.clone(),
            reason,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }
        let content = toml::to_string(table).map_err(|e| write_err(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| write_err(e.to_string()))
    }
}

impl SettingsStore for FileSettingsStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        let table = self.read_table()?;
        match table.get(key) {
            None => Ok(None),
            Some(toml::Value::Boolean(b)) => Ok(Some(*b)),
            Some(other) => Err(ConfigError::ValidationError(format!(
                "setting '{key}' must be a boolean, found {}",
                other.type_str()
            ))),
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), ConfigError> {
        let mut table = self.read_table()?;
        table.insert(key.to_string(), toml::Value::Boolean(value));
        self.write_table(&table)
    }
}

/// An in-memory [`SettingsStore`] for embedders and tests.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<String, bool>>,
}

impl MemorySettingsStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with `compile_to_cache` preset.
    pub fn with_compile_to_cache(enabled: bool) -> Self {
        let store = Self::new();
        store
            .values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(COMPILE_TO_CACHE.to_string(), enabled);
        store
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).copied())
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), ConfigError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_defaults_to_disabled() {
        let store = MemorySettingsStore::new();
        assert_eq!(store.get_bool(COMPILE_TO_CACHE).unwrap(), None);
        assert!(!store.compile_to_cache().unwrap());
    }

    #[test]
    fn memory_store_preset() {
        let store = MemorySettingsStore::with_compile_to_cache(true);
        assert!(store.compile_to_cache().unwrap());
        store.set_bool(COMPILE_TO_CACHE, false).unwrap();
        assert!(!store.compile_to_cache().unwrap());
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(&dir.path().join(".strata/settings.toml"));
        assert_eq!(store.get_bool(COMPILE_TO_CACHE).unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".strata/settings.toml");
        FileSettingsStore::new(&path)
            .set_bool(COMPILE_TO_CACHE, true)
            .unwrap();
        assert!(path.exists());

        let reopened = FileSettingsStore::new(&path);
        assert!(reopened.compile_to_cache().unwrap());
    }

    #[test]
    fn file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "theme = \"dark\"\n").unwrap();

        let store = FileSettingsStore::new(&path);
        store.set_bool(COMPILE_TO_CACHE, true).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("theme"));
        assert!(content.contains("compile_to_cache = true"));
    }

    #[test]
    fn file_store_rejects_non_boolean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "compile_to_cache = \"yes\"\n").unwrap();

        let err = FileSettingsStore::new(&path)
            .get_bool(COMPILE_TO_CACHE)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn file_store_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        let err = FileSettingsStore::new(&path).get_bool("x").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
