//! Conformance test helpers for the Strata build orchestrator.
//!
//! Provides an on-disk project fixture and a scripted compiler whose
//! behavior is driven by the unit source text, so integration tests can
//! describe a layered project and assert on the build that comes out.

#![warn(missing_docs)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use strata_cache::{ArtifactCache, BuildManifest};
use strata_common::{BuildEnv, UnitIdentity};
use strata_compile::{
    BuildSummary, CompileError, CompileOrchestrator, CompilerService, ConfigBundleProvider,
    Outcome, PreCompileReport, ResolutionHook, UnitSource,
};
use strata_config::{load_config_from_str, MemorySettingsStore, ProjectLayout};
use tempfile::TempDir;

/// Prefix the scripted compiler puts in front of every artifact.
pub const ARTIFACT_PREFIX: &[u8] = b"BC:";

/// A compiler driven by directives in the unit source.
///
/// Each line is checked in order:
/// - `use <Symbol>` asks the hook to resolve `<Symbol>`;
/// - `fail` rejects the unit with `syntax error` on that line;
/// - `panic` panics.
///
/// Anything else is ignored. The artifact is [`ARTIFACT_PREFIX`] followed by
/// the source bytes. Every call is recorded by logical path.
#[derive(Debug, Default)]
pub struct ScriptedCompiler {
    calls: Mutex<Vec<String>>,
}

impl ScriptedCompiler {
    /// Creates a compiler with an empty call record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the logical path of every unit compiled, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns how many times `logical` was compiled (case-insensitive).
    pub fn call_count(&self, logical: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.eq_ignore_ascii_case(logical))
            .count()
    }
}

impl CompilerService for ScriptedCompiler {
    fn compile_unit(
        &self,
        unit: &UnitSource,
        hook: &mut dyn ResolutionHook,
    ) -> Result<Vec<u8>, CompileError> {
        self.calls
            .lock()
            .unwrap()
            .push(unit.identity.logical_path().to_string());

        let text = String::from_utf8_lossy(&unit.bytes).into_owned();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if let Some(symbol) = line.strip_prefix("use ") {
                hook.resolve(symbol.trim());
            } else if line == "fail" {
                return Err(CompileError::Rejected {
                    message: "syntax error".to_string(),
                    line: Some(n as u32 + 1),
                });
            } else if line == "panic" {
                panic!("scripted compiler panic in {}", unit.identity);
            }
        }

        let mut artifact = ARTIFACT_PREFIX.to_vec();
        artifact.extend_from_slice(&unit.bytes);
        Ok(artifact)
    }
}

/// A temporary project directory with a `strata.toml`.
pub struct ProjectFixture {
    dir: TempDir,
    config: String,
}

impl ProjectFixture {
    /// Creates a project named `fixture` with default layout.
    pub fn new() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().unwrap(),
            config: "[project]\nname = \"fixture\"\nversion = \"0.1.0\"\n".to_string(),
        };
        fixture.write_config();
        fixture
    }

    /// Appends raw TOML to `strata.toml`.
    pub fn with_config(mut self, toml: &str) -> Self {
        self.config.push_str(toml);
        self.config.push('\n');
        self.write_config();
        self
    }

    /// Declares the source roots, in priority order.
    pub fn with_roots(self, roots: &[&str]) -> Self {
        let list: Vec<String> = roots.iter().map(|r| format!("\"{r}\"")).collect();
        self.with_config(&format!("[sources]\nroots = [{}]", list.join(", ")))
    }

    /// Registers archives, in order.
    pub fn with_archives(mut self, archives: &[&str]) -> Self {
        for archive in archives {
            self = self.with_config(&format!("[[archives]]\npath = \"{archive}\""));
        }
        self
    }

    /// Returns the project root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a file relative to the project root.
    pub fn file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Writes a zip archive relative to the project root.
    pub fn archive(&self, rel: &str, entries: &[(&str, &str)]) -> PathBuf {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut zip = zip::ZipWriter::new(fs::File::create(&path).unwrap());
        for (name, content) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    /// Parses the current `strata.toml` and resolves the layout.
    pub fn layout(&self) -> ProjectLayout {
        let config = load_config_from_str(&self.config).unwrap();
        ProjectLayout::resolve(self.dir.path(), &config)
    }

    /// Builds an orchestrator with compile-to-cache enabled and bundles
    /// served from the configuration.
    pub fn orchestrator(&self, compiler: Arc<ScriptedCompiler>) -> CompileOrchestrator {
        let layout = self.layout();
        let bundles = ConfigBundleProvider::new(layout.bundles.clone());
        CompileOrchestrator::new(
            layout,
            Arc::new(MemorySettingsStore::with_compile_to_cache(true)),
            compiler,
        )
        .with_bundle_provider(Arc::new(bundles))
    }

    /// Returns the artifact cache of the current layout.
    pub fn cache(&self) -> ArtifactCache {
        let layout = self.layout();
        ArtifactCache::new(&layout.cache_dir, &layout.artifact_ext)
    }

    fn write_config(&self) {
        fs::write(self.dir.path().join("strata.toml"), &self.config).unwrap();
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a pre-compile + production compile on a fixture.
pub struct BuildRun {
    /// The pre-compile report.
    pub pre_compile: PreCompileReport,
    /// The compile summary.
    pub summary: BuildSummary,
    /// Lines written to the log sink.
    pub lines: Vec<String>,
    /// The manifest saved by the compile, if any.
    pub manifest: Option<BuildManifest>,
}

impl BuildRun {
    /// Logical paths with a `Compiled` event, sorted.
    pub fn compiled(&self) -> Vec<String> {
        self.with_outcome(Outcome::Compiled)
    }

    /// Logical paths with an `Error` event, sorted.
    pub fn failed(&self) -> Vec<String> {
        self.with_outcome(Outcome::Error)
    }

    fn with_outcome(&self, outcome: Outcome) -> Vec<String> {
        let mut ids: Vec<String> = self
            .summary
            .events
            .iter()
            .filter(|e| e.outcome == outcome)
            .map(|e| e.identity.clone())
            .collect();
        ids.sort();
        ids
    }
}

/// Runs pre-compile then a production compile, capturing log lines.
pub fn run_build(orchestrator: &CompileOrchestrator) -> BuildRun {
    let lines = Mutex::new(Vec::new());
    let sink = |line: &str| lines.lock().unwrap().push(line.to_string());
    let pre_compile = orchestrator.run_pre_compile().unwrap();
    let summary = orchestrator.run_compile(BuildEnv::Prod, Some(&sink)).unwrap();
    let manifest = BuildManifest::load(orchestrator.cache().cache_dir()).unwrap();
    BuildRun {
        pre_compile,
        summary,
        lines: lines.into_inner().unwrap(),
        manifest,
    }
}

/// Reads the cached artifact of `symbol`, if any.
pub fn artifact(cache: &ArtifactCache, symbol: &str) -> Option<Vec<u8>> {
    cache.read(&UnitIdentity::from_symbol(symbol))
}
