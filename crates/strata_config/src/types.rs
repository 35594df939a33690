//! Configuration types deserialized from `strata.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use strata_common::BuildEnv;

/// The top-level project configuration parsed from `strata.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Source directory layout.
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Artifact cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Unit naming and lazy-resolution settings.
    #[serde(default)]
    pub compile: CompileConfig,
    /// External compiler service invocation.
    #[serde(default)]
    pub compiler: Option<CompilerConfig>,
    /// Archive libraries, consulted in declaration order.
    #[serde(default)]
    pub archives: Vec<ArchiveSpec>,
    /// Bundles contributing vendor source roots.
    #[serde(default)]
    pub bundles: Vec<BundleSpec>,
}

/// Core project metadata required in every `strata.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    #[serde(default)]
    pub version: String,
}

/// Where sources live, relative to the project directory.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Directory scanned by pre-compile for sources to invalidate.
    #[serde(default = "default_primary")]
    pub primary: String,
    /// Generated-source directory; always the highest-priority root.
    #[serde(default = "default_generated")]
    pub generated: String,
    /// Directory cleared of leftover compiled intermediates before a build.
    /// Defaults to the primary directory.
    #[serde(default)]
    pub staging: Option<String>,
    /// Declared source roots in priority order, after the generated directory.
    #[serde(
        default = "default_roots",
        deserialize_with = "deserialize_string_or_vec"
    )]
    pub roots: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            generated: default_generated(),
            staging: None,
            roots: default_roots(),
        }
    }
}

/// Artifact cache location.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Cache root. Defaults to the generated directory, which is what gets
    /// deployed.
    #[serde(default)]
    pub dir: Option<String>,
}

/// Naming conventions for units plus the dry-pass entry points.
#[derive(Debug, Clone, Deserialize)]
pub struct CompileConfig {
    /// Extension of source-bearing files, without the dot.
    #[serde(default = "default_source_ext")]
    pub source_ext: String,
    /// Extension of compiled artifacts, without the dot.
    #[serde(default = "default_artifact_ext")]
    pub artifact_ext: String,
    /// Archive entries under this prefix are metadata, never units.
    #[serde(default = "default_metadata_prefix")]
    pub metadata_prefix: String,
    /// Symbols resolved through the lazy hook before the sweep starts.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub entry_points: Vec<String>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            source_ext: default_source_ext(),
            artifact_ext: default_artifact_ext(),
            metadata_prefix: default_metadata_prefix(),
            entry_points: Vec::new(),
        }
    }
}

/// The external command that turns one unit's source into an artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    /// Executable to run, one process per unit.
    pub command: String,
    /// Extra arguments passed before any per-unit arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

/// An archive library registered with the project.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveSpec {
    /// Path to the archive, relative to the project directory or absolute.
    pub path: String,
}

/// A bundle whose vendor directory becomes a source root.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleSpec {
    /// Bundle name, used in log output.
    pub name: String,
    /// Vendor directory, relative to the project directory or absolute.
    pub vendor: String,
    /// Environments the bundle applies to. Empty means every environment.
    #[serde(default)]
    pub envs: Vec<BuildEnv>,
}

impl BundleSpec {
    /// Returns `true` if the bundle contributes to builds for `env`.
    pub fn applies_to(&self, env: BuildEnv) -> bool {
        self.envs.is_empty() || self.envs.contains(&env)
    }
}

fn default_primary() -> String {
    "src".to_string()
}

fn default_generated() -> String {
    "src_generated".to_string()
}

fn default_roots() -> Vec<String> {
    vec!["src".to_string()]
}

fn default_source_ext() -> String {
    "php".to_string()
}

fn default_artifact_ext() -> String {
    "phb".to_string()
}

fn default_metadata_prefix() -> String {
    "JPHP-INF/".to_string()
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows `roots = "src"` as shorthand for `roots = ["src"]`.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
