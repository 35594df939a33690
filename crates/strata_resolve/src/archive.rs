//! Lazy index over archive libraries.
//!
//! Archives are zip containers holding additional units. Each is listed at
//! most once per index, on the first lookup that reaches it. Archives are
//! consulted only after every source root has missed.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use strata_common::UnitIdentity;
use zip::ZipArchive;

use crate::error::ArchiveError;

/// Location of a unit inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntryRef {
    /// The archive file.
    pub archive: PathBuf,
    /// Entry name within the archive.
    pub entry: String,
}

impl std::fmt::Display for ArchiveEntryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}!{}", self.archive.display(), self.entry)
    }
}

enum LibraryState {
    Unopened,
    /// File absent or not a readable zip; yields nothing for this index.
    Unavailable,
    Indexed {
        zip: ZipArchive<File>,
        /// Source entry names, sorted, one per identity.
        entries: Vec<String>,
        by_identity: HashMap<UnitIdentity, usize>,
    },
}

struct ArchiveLibrary {
    path: PathBuf,
    key: String,
    state: LibraryState,
}

/// Archive libraries in registration order, indexed on first use.
pub struct ArchiveLibraryIndex {
    libraries: Vec<ArchiveLibrary>,
    source_ext: String,
    metadata_prefix: String,
}

impl ArchiveLibraryIndex {
    /// Creates an empty index.
    ///
    /// Only entries with `source_ext` are units; entries under
    /// `metadata_prefix` never are.
    pub fn new(source_ext: &str, metadata_prefix: &str) -> Self {
        Self {
            libraries: Vec::new(),
            source_ext: source_ext.to_string(),
            metadata_prefix: normalize_entry_name(metadata_prefix),
        }
    }

    /// Appends an archive. Returns `false` if the same path (compared
    /// case-insensitively with normalized separators) is already registered.
    pub fn register(&mut self, path: &Path) -> bool {
        let key = library_key(path);
        if self.libraries.iter().any(|l| l.key == key) {
            return false;
        }
        self.libraries.push(ArchiveLibrary {
            path: path.to_path_buf(),
            key,
            state: LibraryState::Unopened,
        });
        true
    }

    /// Returns the registered archives in registration order.
    pub fn archives(&self) -> Vec<PathBuf> {
        self.libraries.iter().map(|l| l.path.clone()).collect()
    }

    /// Returns `true` if no archives are registered.
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Lists an archive's entries if that has not happened yet.
    ///
    /// Idempotent. A missing or unreadable archive is logged once and then
    /// treated as empty; later calls report it as [`ArchiveError::Missing`].
    pub fn open(&mut self, archive: &Path) -> Result<(), ArchiveError> {
        let idx = self
            .position(archive)
            .ok_or_else(|| ArchiveError::NotRegistered {
                path: archive.to_path_buf(),
            })?;
        self.open_at(idx)
    }

    /// Finds the first archive, in registration order, containing `identity`.
    pub fn find_entry(&mut self, identity: &UnitIdentity) -> Option<ArchiveEntryRef> {
        for idx in 0..self.libraries.len() {
            if self.open_at(idx).is_err() {
                continue;
            }
            let library = &self.libraries[idx];
            if let LibraryState::Indexed {
                entries,
                by_identity,
                ..
            } = &library.state
            {
                if let Some(&pos) = by_identity.get(identity) {
                    return Some(ArchiveEntryRef {
                        archive: library.path.clone(),
                        entry: entries[pos].clone(),
                    });
                }
            }
        }
        None
    }

    /// Returns the source entries of one archive, sorted by name.
    ///
    /// Metadata entries, non-source entries and entries naming an identity
    /// already provided earlier in the archive are excluded. An unavailable
    /// archive has no entries.
    pub fn entries(&mut self, archive: &Path) -> Vec<String> {
        let Some(idx) = self.position(archive) else {
            return Vec::new();
        };
        if self.open_at(idx).is_err() {
            return Vec::new();
        }
        match &self.libraries[idx].state {
            LibraryState::Indexed { entries, .. } => entries.clone(),
            _ => Vec::new(),
        }
    }

    /// Extracts the bytes of one entry.
    pub fn read_entry(&mut self, entry: &ArchiveEntryRef) -> Result<Vec<u8>, ArchiveError> {
        let idx = self
            .position(&entry.archive)
            .ok_or_else(|| ArchiveError::NotRegistered {
                path: entry.archive.clone(),
            })?;
        self.open_at(idx)?;

        let read_err = |reason: String| ArchiveError::Read {
            path: entry.archive.clone(),
            entry: entry.entry.clone(),
            reason,
        };
        match &mut self.libraries[idx].state {
            LibraryState::Indexed { zip, .. } => {
                let mut file = zip.by_name(&entry.entry).map_err(|e| read_err(e.to_string()))?;
                let mut bytes = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut bytes)
                    .map_err(|e| read_err(e.to_string()))?;
                Ok(bytes)
            }
            _ => Err(ArchiveError::Missing {
                path: entry.archive.clone(),
            }),
        }
    }

    fn position(&self, archive: &Path) -> Option<usize> {
        let key = library_key(archive);
        self.libraries.iter().position(|l| l.key == key)
    }

    fn open_at(&mut self, idx: usize) -> Result<(), ArchiveError> {
        let library = &mut self.libraries[idx];
        match library.state {
            LibraryState::Indexed { .. } => return Ok(()),
            LibraryState::Unavailable => {
                return Err(ArchiveError::Missing {
                    path: library.path.clone(),
                })
            }
            LibraryState::Unopened => {}
        }

        match index_archive(&library.path, &self.source_ext, &self.metadata_prefix) {
            Ok((zip, entries, by_identity)) => {
                tracing::debug!(
                    archive = %library.path.display(),
                    units = entries.len(),
                    "indexed archive"
                );
                library.state = LibraryState::Indexed {
                    zip,
                    entries,
                    by_identity,
                };
                Ok(())
            }
            Err(e) => {
                tracing::warn!("skipping archive: {e}");
                library.state = LibraryState::Unavailable;
                Err(e)
            }
        }
    }
}

type Indexed = (ZipArchive<File>, Vec<String>, HashMap<UnitIdentity, usize>);

fn index_archive(path: &Path, source_ext: &str, metadata_prefix: &str) -> Result<Indexed, ArchiveError> {
    if !path.is_file() {
        return Err(ArchiveError::Missing {
            path: path.to_path_buf(),
        });
    }
    let open_err = |reason: String| ArchiveError::Open {
        path: path.to_path_buf(),
        reason,
    };
    let file = File::open(path).map_err(|e| open_err(e.to_string()))?;
    let zip = ZipArchive::new(file).map_err(|e| open_err(e.to_string()))?;

    let mut entries = Vec::new();
    let mut by_identity = HashMap::new();
    for name in zip.file_names() {
        if !is_enclosed(name) {
            tracing::warn!(archive = %path.display(), entry = name, "skipping entry outside the archive root");
            continue;
        }
        let normalized = normalize_entry_name(name);
        if name.ends_with('/') || !is_source_entry(&normalized, source_ext) {
            continue;
        }
        if !metadata_prefix.is_empty() && normalized.starts_with(metadata_prefix) {
            continue;
        }
        let identity = UnitIdentity::from_entry_name(&normalized, source_ext);
        if identity.is_empty() {
            continue;
        }
        if by_identity.contains_key(&identity) {
            tracing::debug!(archive = %path.display(), entry = name, "duplicate unit ignored");
            continue;
        }
        entries.push(name.to_string());
        by_identity.insert(identity, entries.len() - 1);
    }

    // The first listed entry owns its identity; sweeps see owners sorted by name.
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| entries[a].cmp(&entries[b]));
    let mut remap = vec![0; entries.len()];
    for (new_pos, &old_pos) in order.iter().enumerate() {
        remap[old_pos] = new_pos;
    }
    let sorted: Vec<String> = order.iter().map(|&i| entries[i].clone()).collect();
    for pos in by_identity.values_mut() {
        *pos = remap[*pos];
    }

    Ok((zip, sorted, by_identity))
}

/// Case-insensitive registration key of an archive path.
fn library_key(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .trim_end_matches('/')
        .to_ascii_lowercase()
}

/// Rejects absolute names, drive prefixes and `..` segments.
fn is_enclosed(name: &str) -> bool {
    let unified = name.replace('\\', "/");
    if unified.starts_with('/') {
        return false;
    }
    let mut segments = unified.split('/');
    if segments.clone().next().is_some_and(|first| first.contains(':')) {
        return false;
    }
    !segments.any(|seg| seg == "..")
}

fn normalize_entry_name(name: &str) -> String {
    name.replace('\\', "/").trim_start_matches('/').to_string()
}

fn is_source_entry(name: &str, source_ext: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case(source_ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn make_archive(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn register_dedups() {
        let mut index = ArchiveLibraryIndex::new("php", "JPHP-INF/");
        assert!(index.register(Path::new("/lib/a.jar")));
        assert!(!index.register(Path::new("/LIB/A.jar")));
        assert!(index.register(Path::new("/lib/b.jar")));
        assert!(index.register(Path::new("/project/../shared/c.jar")));
        assert!(index.register(Path::new("/project/../shared/d.jar")));
        assert!(!index.register(Path::new("\\project\\..\\shared\\D.jar")));
        assert_eq!(index.archives().len(), 4);
    }

    #[test]
    fn finds_entry_by_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("gui.jar");
        make_archive(&jar, &[("php/gui/UXForm.php", "<?php class UXForm {}")]);

        let mut index = ArchiveLibraryIndex::new("php", "JPHP-INF/");
        index.register(&jar);
        let hit = index
            .find_entry(&UnitIdentity::from_symbol("php\\gui\\UXForm"))
            .unwrap();
        assert_eq!(hit.entry, "php/gui/UXForm.php");
        assert_eq!(hit.archive, jar);
        assert_eq!(index.read_entry(&hit).unwrap(), b"<?php class UXForm {}");
    }

    #[test]
    fn registration_order_wins() {
        let dir = tempfile::tempdir().unwrap();
        let l0 = dir.path().join("l0.jar");
        let l1 = dir.path().join("l1.jar");
        make_archive(&l0, &[("B.php", "from l0")]);
        make_archive(&l1, &[("B.php", "from l1")]);

        let mut index = ArchiveLibraryIndex::new("php", "JPHP-INF/");
        index.register(&l0);
        index.register(&l1);
        let hit = index.find_entry(&UnitIdentity::from_symbol("B")).unwrap();
        assert_eq!(hit.archive, l0);
        assert_eq!(index.read_entry(&hit).unwrap(), b"from l0");
    }

    #[test]
    fn metadata_entries_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        make_archive(
            &jar,
            &[
                ("JPHP-INF/launcher.php", "meta"),
                ("JPHP-INF/.bootstrap.php", "meta"),
                ("lib/Real.php", "real"),
                ("lib/notes.txt", "text"),
            ],
        );

        let mut index = ArchiveLibraryIndex::new("php", "JPHP-INF/");
        index.register(&jar);
        assert_eq!(index.entries(&jar), ["lib/Real.php"]);
        assert!(index
            .find_entry(&UnitIdentity::from_symbol("JPHP-INF/launcher"))
            .is_none());
    }

    #[test]
    fn missing_archive_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.jar");
        make_archive(&present, &[("C.php", "c")]);

        let mut index = ArchiveLibraryIndex::new("php", "JPHP-INF/");
        let absent = dir.path().join("absent.jar");
        index.register(&absent);
        index.register(&present);

        let err = index.open(&absent).unwrap_err();
        assert!(matches!(err, ArchiveError::Missing { .. }));
        let hit = index.find_entry(&UnitIdentity::from_symbol("C")).unwrap();
        assert_eq!(hit.archive, present);
        assert!(index.entries(&absent).is_empty());
    }

    #[test]
    fn corrupt_archive_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("broken.jar");
        std::fs::write(&jar, b"definitely not a zip").unwrap();

        let mut index = ArchiveLibraryIndex::new("php", "JPHP-INF/");
        index.register(&jar);
        assert!(matches!(index.open(&jar), Err(ArchiveError::Open { .. })));
        assert!(matches!(index.open(&jar), Err(ArchiveError::Missing { .. })));
        assert!(index.find_entry(&UnitIdentity::from_symbol("x")).is_none());
    }

    #[test]
    fn open_unregistered_errors() {
        let mut index = ArchiveLibraryIndex::new("php", "JPHP-INF/");
        let err = index.open(Path::new("/nowhere.jar")).unwrap_err();
        assert!(matches!(err, ArchiveError::NotRegistered { .. }));
    }

    #[test]
    fn entries_sorted_and_first_duplicate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("dup.jar");
        make_archive(
            &jar,
            &[("z/Last.php", "z"), ("a/Dup.php", "first"), ("A/dup.php", "second")],
        );

        let mut index = ArchiveLibraryIndex::new("php", "JPHP-INF/");
        index.register(&jar);
        assert_eq!(index.entries(&jar), ["a/Dup.php", "z/Last.php"]);
        let hit = index.find_entry(&UnitIdentity::from_symbol("a/dup")).unwrap();
        assert_eq!(hit.entry, "a/Dup.php");
        assert_eq!(index.read_entry(&hit).unwrap(), b"first");
    }

    #[test]
    fn entries_escaping_the_archive_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("slip.jar");
        make_archive(
            &jar,
            &[
                ("../../escaped.php", "evil"),
                ("lib/../../Up.php", "evil"),
                ("/abs/Root.php", "evil"),
                ("C:/win/Drive.php", "evil"),
                ("lib/Safe.php", "safe"),
            ],
        );

        let mut index = ArchiveLibraryIndex::new("php", "JPHP-INF/");
        index.register(&jar);
        assert_eq!(index.entries(&jar), ["lib/Safe.php"]);
        assert!(index.find_entry(&UnitIdentity::from_symbol("abs/Root")).is_none());
        assert!(index.find_entry(&UnitIdentity::from_symbol("../../escaped")).is_none());
    }

    #[test]
    fn enclosed_names() {
        assert!(is_enclosed("a/b/C.php"));
        assert!(is_enclosed("a/..b/C.php"));
        assert!(!is_enclosed("../C.php"));
        assert!(!is_enclosed("a\\..\\..\\C.php"));
        assert!(!is_enclosed("/C.php"));
        assert!(!is_enclosed("D:\\C.php"));
    }

    #[test]
    fn entry_ref_display() {
        let r = ArchiveEntryRef {
            archive: PathBuf::from("lib/gui.jar"),
            entry: "a/B.php".to_string(),
        };
        assert_eq!(r.to_string(), "lib/gui.jar!a/B.php");
    }
}
