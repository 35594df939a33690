//! Resolution of identities across ordered source roots.

use std::path::{Path, PathBuf};

use strata_common::UnitIdentity;
use walkdir::WalkDir;

/// A directory contributing candidate units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot {
    /// Root directory.
    pub path: PathBuf,
    /// Position in the root list; lower wins.
    pub priority: usize,
    /// Whether this is the generated-source directory.
    pub generated: bool,
}

/// A source file located under a root.
#[derive(Debug, Clone)]
pub struct SourcePath {
    /// Priority of the root that provided the file.
    pub root_priority: usize,
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Path relative to its root, in on-disk case.
    pub relative: PathBuf,
    /// Identity derived from the relative path.
    pub identity: UnitIdentity,
}

/// Resolves identities against ordered source roots.
///
/// Holds no state besides the root list; every lookup goes to the filesystem.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    roots: Vec<SourceRoot>,
    source_ext: String,
}

impl SourceResolver {
    /// Creates a resolver. The generated directory, if given, becomes
    /// priority 0 and `others` follow in iteration order.
    pub fn new<I>(generated: Option<&Path>, others: I, source_ext: &str) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut roots: Vec<SourceRoot> = generated
            .map(|g| SourceRoot {
                path: g.to_path_buf(),
                priority: 0,
                generated: true,
            })
            .into_iter()
            .collect();
        for path in others {
            roots.push(SourceRoot {
                path,
                priority: roots.len(),
                generated: false,
            });
        }
        Self {
            roots,
            source_ext: source_ext.to_string(),
        }
    }

    /// Returns the roots in priority order.
    pub fn roots(&self) -> &[SourceRoot] {
        &self.roots
    }

    /// Returns the source extension this resolver looks for.
    pub fn source_ext(&self) -> &str {
        &self.source_ext
    }

    /// Finds the highest-priority root providing `identity`.
    ///
    /// Tries the exact logical path first, then falls back to a
    /// case-insensitive walk of the path segments.
    pub fn resolve(&self, identity: &UnitIdentity) -> Option<SourcePath> {
        if identity.is_empty() {
            return None;
        }
        let segments: Vec<&str> = identity.segments().collect();

        for root in &self.roots {
            let exact = exact_candidate(&root.path, &segments, &self.source_ext);
            let found = if exact.is_file() {
                Some(exact)
            } else {
                find_case_insensitive(&root.path, &segments, &self.source_ext)
            };

            if let Some(path) = found {
                let Ok(relative) = path.strip_prefix(&root.path).map(Path::to_path_buf) else {
                    continue;
                };
                tracing::trace!(unit = %identity, root = root.priority, "resolved from root");
                return Some(SourcePath {
                    root_priority: root.priority,
                    identity: UnitIdentity::from_relative_path(&relative, &self.source_ext),
                    path,
                    relative,
                });
            }
        }
        None
    }

    /// Lists every source file under `root`, sorted by path.
    pub fn sweep(&self, root: &SourceRoot) -> Vec<SourcePath> {
        files_with_extension(&root.path, &self.source_ext)
            .into_iter()
            .filter_map(|path| {
                let relative = path.strip_prefix(&root.path).ok()?.to_path_buf();
                Some(SourcePath {
                    root_priority: root.priority,
                    identity: UnitIdentity::from_relative_path(&relative, &self.source_ext),
                    path,
                    relative,
                })
            })
            .collect()
    }
}

/// Recursively collects files under `dir` whose extension matches `ext`
/// (case-insensitively), sorted by path.
///
/// A missing directory yields nothing. Unreadable entries are logged and
/// skipped.
pub fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "directory absent, nothing to scan");
        return Vec::new();
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let matches = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext));
        if matches {
            files.push(entry.into_path());
        }
    }
    files
}

fn exact_candidate(root: &Path, segments: &[&str], ext: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for (i, segment) in segments.iter().enumerate() {
        if i + 1 == segments.len() {
            path.push(format!("{segment}.{ext}"));
        } else {
            path.push(segment);
        }
    }
    path
}

fn find_case_insensitive(root: &Path, segments: &[&str], ext: &str) -> Option<PathBuf> {
    let mut current = root.to_path_buf();
    for (i, segment) in segments.iter().enumerate() {
        let wanted = if i + 1 == segments.len() {
            format!("{segment}.{ext}")
        } else {
            (*segment).to_string()
        };
        let entry = std::fs::read_dir(&current)
            .ok()?
            .flatten()
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|n| n.eq_ignore_ascii_case(&wanted))
            })
            .min_by_key(|e| e.file_name())?;
        current = entry.path();
    }
    current.is_file().then_some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("<?php // {rel}")).unwrap();
    }

    #[test]
    fn generated_root_comes_first() {
        let resolver = SourceResolver::new(
            Some(Path::new("/p/gen")),
            vec![PathBuf::from("/p/src"), PathBuf::from("/p/vendor")],
            "php",
        );
        let roots = resolver.roots();
        assert_eq!(roots.len(), 3);
        assert!(roots[0].generated);
        assert_eq!(roots[1].priority, 1);
        assert_eq!(roots[2].path, PathBuf::from("/p/vendor"));
    }

    #[test]
    fn first_root_wins() {
        let r0 = tempfile::tempdir().unwrap();
        let r1 = tempfile::tempdir().unwrap();
        write(r0.path(), "app/A.php");
        write(r1.path(), "app/A.php");

        let resolver = SourceResolver::new(
            None,
            vec![r0.path().to_path_buf(), r1.path().to_path_buf()],
            "php",
        );
        let hit = resolver.resolve(&UnitIdentity::from_symbol("app\\A")).unwrap();
        assert_eq!(hit.root_priority, 0);
        assert_eq!(hit.path, r0.path().join("app/A.php"));
    }

    #[test]
    fn falls_through_to_later_root() {
        let r0 = tempfile::tempdir().unwrap();
        let r1 = tempfile::tempdir().unwrap();
        write(r1.path(), "lib/Only.php");

        let resolver = SourceResolver::new(
            None,
            vec![r0.path().to_path_buf(), r1.path().to_path_buf()],
            "php",
        );
        let hit = resolver.resolve(&UnitIdentity::from_symbol("lib/Only")).unwrap();
        assert_eq!(hit.root_priority, 1);
        assert_eq!(hit.relative, PathBuf::from("lib/Only.php"));
    }

    #[test]
    fn case_insensitive_match_uses_disk_case() {
        let r0 = tempfile::tempdir().unwrap();
        write(r0.path(), "App/Forms/MainForm.php");

        let resolver = SourceResolver::new(None, vec![r0.path().to_path_buf()], "php");
        let hit = resolver
            .resolve(&UnitIdentity::from_symbol("app\\forms\\mainform"))
            .unwrap();
        assert_eq!(hit.relative, PathBuf::from("App/Forms/MainForm.php"));
        assert_eq!(hit.identity.logical_path(), "App/Forms/MainForm");
    }

    #[test]
    fn miss_returns_none() {
        let r0 = tempfile::tempdir().unwrap();
        write(r0.path(), "a/B.php");
        let resolver = SourceResolver::new(None, vec![r0.path().to_path_buf()], "php");
        assert!(resolver.resolve(&UnitIdentity::from_symbol("a/C")).is_none());
        assert!(resolver.resolve(&UnitIdentity::from_symbol("/")).is_none());
    }

    #[test]
    fn directory_named_like_unit_is_not_a_hit() {
        let r0 = tempfile::tempdir().unwrap();
        fs::create_dir_all(r0.path().join("a/B.php")).unwrap();
        let resolver = SourceResolver::new(None, vec![r0.path().to_path_buf()], "php");
        assert!(resolver.resolve(&UnitIdentity::from_symbol("a/B")).is_none());
    }

    #[test]
    fn sweep_lists_sources_sorted() {
        let r0 = tempfile::tempdir().unwrap();
        write(r0.path(), "b/Two.php");
        write(r0.path(), "a/One.php");
        fs::write(r0.path().join("a/One.phb"), "compiled").unwrap();
        fs::write(r0.path().join("readme.txt"), "docs").unwrap();

        let resolver = SourceResolver::new(None, vec![r0.path().to_path_buf()], "php");
        let root = resolver.roots()[0].clone();
        let found: Vec<_> = resolver
            .sweep(&root)
            .into_iter()
            .map(|s| s.identity.logical_path().to_string())
            .collect();
        assert_eq!(found, ["a/One", "b/Two"]);
    }

    #[test]
    fn files_with_extension_missing_dir() {
        assert!(files_with_extension(Path::new("/nonexistent/strata"), "php").is_empty());
    }
}
