//! Resolution of configured relative paths into an absolute project layout.

use crate::types::{BundleSpec, ProjectConfig};
use std::path::{Path, PathBuf};

/// Directory under the project root holding Strata's own state.
const STATE_DIR: &str = ".strata";

/// Settings file inside [`STATE_DIR`].
const SETTINGS_FILE: &str = "settings.toml";

/// A project configuration with every directory resolved against the
/// project root.
///
/// Root order is preserved exactly as configured; nothing downstream
/// re-sorts it.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// The project root directory.
    pub project_dir: PathBuf,
    /// Directory whose sources pre-compile invalidates.
    pub primary_dir: PathBuf,
    /// Generated-source directory, the first root of every build.
    pub generated_dir: PathBuf,
    /// Directory swept for leftover compiled intermediates.
    pub staging_dir: PathBuf,
    /// Artifact cache root.
    pub cache_dir: PathBuf,
    /// Declared source roots in priority order (excluding the generated directory).
    pub roots: Vec<PathBuf>,
    /// Archive libraries in registration order.
    pub archives: Vec<PathBuf>,
    /// Bundles that may contribute vendor roots.
    pub bundles: Vec<BundleSpec>,
    /// Source file extension, without the dot.
    pub source_ext: String,
    /// Artifact file extension, without the dot.
    pub artifact_ext: String,
    /// Reserved archive metadata prefix.
    pub metadata_prefix: String,
    /// Symbols resolved by the dry pass.
    pub entry_points: Vec<String>,
}

impl ProjectLayout {
    /// Resolves `config` against `project_dir`.
    ///
    /// Absolute configured paths are kept as-is; relative ones are joined to
    /// the project directory.
    pub fn resolve(project_dir: &Path, config: &ProjectConfig) -> Self {
        let at = |p: &str| join_project(project_dir, p);

        let primary_dir = at(&config.sources.primary);
        let generated_dir = at(&config.sources.generated);
        let staging_dir = config
            .sources
            .staging
            .as_deref()
            .map(at)
            .unwrap_or_else(|| primary_dir.clone());
        let cache_dir = config
            .cache
            .dir
            .as_deref()
            .map(at)
            .unwrap_or_else(|| generated_dir.clone());

        let bundles = config
            .bundles
            .iter()
            .map(|b| BundleSpec {
                vendor: at(&b.vendor).to_string_lossy().into_owned(),
                ..b.clone()
            })
            .collect();

        Self {
            project_dir: project_dir.to_path_buf(),
            primary_dir,
            generated_dir,
            staging_dir,
            cache_dir,
            roots: config.sources.roots.iter().map(|r| at(r)).collect(),
            archives: config.archives.iter().map(|a| at(&a.path)).collect(),
            bundles,
            source_ext: config.compile.source_ext.clone(),
            artifact_ext: config.compile.artifact_ext.clone(),
            metadata_prefix: config.compile.metadata_prefix.clone(),
            entry_points: config.compile.entry_points.clone(),
        }
    }

    /// Returns the path of the persisted build settings file.
    pub fn settings_path(&self) -> PathBuf {
        self.project_dir.join(STATE_DIR).join(SETTINGS_FILE)
    }

    /// Returns `true` if `path` carries the configured source extension.
    pub fn is_source_file(&self, path: &Path) -> bool {
        has_extension(path, &self.source_ext)
    }

    /// Returns `true` if `path` carries the configured artifact extension.
    pub fn is_artifact_file(&self, path: &Path) -> bool {
        has_extension(path, &self.artifact_ext)
    }
}

fn join_project(project_dir: &Path, configured: &str) -> PathBuf {
    let p = Path::new(configured);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        project_dir.join(p)
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    fn layout(toml: &str) -> ProjectLayout {
        let config = load_config_from_str(toml).unwrap();
        ProjectLayout::resolve(Path::new("/work/shop"), &config)
    }

    #[test]
    fn defaults_resolve_under_project() {
        let l = layout("[project]\nname = \"shop\"\n");
        assert_eq!(l.primary_dir, PathBuf::from("/work/shop/src"));
        assert_eq!(l.generated_dir, PathBuf::from("/work/shop/src_generated"));
        assert_eq!(l.staging_dir, l.primary_dir);
        assert_eq!(l.cache_dir, l.generated_dir);
        assert_eq!(l.roots, vec![PathBuf::from("/work/shop/src")]);
        assert_eq!(
            l.settings_path(),
            PathBuf::from("/work/shop/.strata/settings.toml")
        );
    }

    #[test]
    fn absolute_paths_kept() {
        let l = layout(
            "[project]\nname = \"shop\"\n[cache]\ndir = \"/var/cache/shop\"\n[[archives]]\npath = \"/opt/lib/a.jar\"\n",
        );
        assert_eq!(l.cache_dir, PathBuf::from("/var/cache/shop"));
        assert_eq!(l.archives, vec![PathBuf::from("/opt/lib/a.jar")]);
    }

    #[test]
    fn root_order_preserved() {
        let l = layout("[project]\nname = \"shop\"\n[sources]\nroots = [\"z\", \"a\", \"m\"]\n");
        let names: Vec<_> = l
            .roots
            .iter()
            .map(|r| r.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["z", "a", "m"]);
    }

    #[test]
    fn bundle_vendor_resolved() {
        let l = layout(
            "[project]\nname = \"shop\"\n[[bundles]]\nname = \"ui\"\nvendor = \"vendor/ui\"\n",
        );
        assert_eq!(l.bundles[0].vendor, "/work/shop/vendor/ui");
        assert_eq!(l.bundles[0].name, "ui");
    }

    #[test]
    fn extension_checks_ignore_case() {
        let l = layout("[project]\nname = \"shop\"\n");
        assert!(l.is_source_file(Path::new("a/B.PHP")));
        assert!(l.is_artifact_file(Path::new("a/B.phb")));
        assert!(!l.is_source_file(Path::new("a/B.phb")));
        assert!(!l.is_source_file(Path::new("a/php")));
    }
}
