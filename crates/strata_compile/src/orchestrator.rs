//! Drives pre-compile and compile passes for one project.
//!
//! A build is two passes. Pre-compile invalidates the cached artifact of
//! every source in the primary directory, records them in the ignore-list,
//! and removes leftover intermediates from the staging directory. Compile
//! then runs, in order:
//!
//! 1. assemble the root list: generated directory, declared roots, bundle
//!    vendor directories;
//! 2. a dry pass resolving the configured entry points through the lazy hook;
//! 3. a sweep of every declared and vendor root;
//! 4. a sweep of the generated directory, compiling each leftover source
//!    beside itself and deleting the source;
//! 5. a sweep of every archive for units neither resolved nor cached.
//!
//! The tracker guarantees each identity is compiled at most once. A unit is
//! marked before its compile starts, so a failing unit is not retried and a
//! unit referencing itself cannot recurse.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata_cache::{
    write_artifact_file, ArtifactCache, ArtifactRecord, BuildManifest, CacheIgnoreList,
    OriginKind,
};
use strata_common::{BuildEnv, ContentHash, UnitIdentity};
use strata_config::{ProjectLayout, SettingsStore};
use strata_resolve::{
    files_with_extension, ArchiveEntryRef, ArchiveLibraryIndex, SourceResolver,
};

use crate::bundle::BundleProvider;
use crate::error::BuildError;
use crate::log::{BuildLog, CompileLogEvent, LogSink};
use crate::service::{
    compile_isolated, CompileError, CompilerService, ResolutionHook, UnitOrigin, UnitSource,
};
use crate::tracker::CompilationTracker;
use crate::worker::CancelToken;

/// What a pre-compile pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreCompileReport {
    /// Sources listed in the ignore-list.
    pub ignored: usize,
    /// Cached artifacts deleted.
    pub invalidated: usize,
    /// Artifacts that could not be deleted.
    pub failed: usize,
    /// Leftover intermediates removed from the staging directory.
    pub stale_removed: usize,
    /// Where the ignore-list was written.
    pub ignore_list: PathBuf,
}

/// What a compile pass did.
#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    /// `false` when the environment or settings disabled compilation.
    pub ran: bool,
    /// Units compiled.
    pub compiled: usize,
    /// Units passed over.
    pub skipped: usize,
    /// Units that failed.
    pub errors: usize,
    /// Whether the build stopped early on cancellation.
    pub cancelled: bool,
    /// Per-unit events in emission order.
    pub events: Vec<CompileLogEvent>,
    /// Logical paths of every identity marked during the build, sorted.
    pub resolved: Vec<String>,
}

/// Result of a full pre-compile + compile build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// The pre-compile pass.
    pub pre_compile: PreCompileReport,
    /// The compile pass.
    pub summary: BuildSummary,
}

/// Orchestrates builds for one project.
pub struct CompileOrchestrator {
    layout: ProjectLayout,
    cache: ArtifactCache,
    settings: Arc<dyn SettingsStore>,
    service: Arc<dyn CompilerService>,
    bundles: Option<Arc<dyn BundleProvider>>,
}

impl CompileOrchestrator {
    /// Creates an orchestrator with no bundle provider.
    pub fn new(
        layout: ProjectLayout,
        settings: Arc<dyn SettingsStore>,
        service: Arc<dyn CompilerService>,
    ) -> Self {
        let cache = ArtifactCache::new(&layout.cache_dir, &layout.artifact_ext);
        Self {
            layout,
            cache,
            settings,
            service,
            bundles: None,
        }
    }

    /// Sets the provider of bundle vendor roots.
    pub fn with_bundle_provider(mut self, provider: Arc<dyn BundleProvider>) -> Self {
        self.bundles = Some(provider);
        self
    }

    /// Returns the project layout.
    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Returns the artifact cache.
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Removes every cached artifact, the ignore-list and the manifest.
    ///
    /// Run when a project is opened so a stale cache from another checkout
    /// is never served.
    pub fn clean(&self) -> Result<usize, BuildError> {
        Ok(self.cache.clear()?)
    }

    /// Invalidates everything the next compile will rebuild.
    ///
    /// Only writing the ignore-list is fatal; failures on individual
    /// artifacts are logged and counted.
    pub fn run_pre_compile(&self) -> Result<PreCompileReport, BuildError> {
        let primary = &self.layout.primary_dir;
        let source_ext = &self.layout.source_ext;
        let mut report = PreCompileReport::default();
        let mut ignore = CacheIgnoreList::new();

        for path in files_with_extension(primary, source_ext) {
            let Ok(relative) = path.strip_prefix(primary) else {
                continue;
            };
            let identity = UnitIdentity::from_relative_path(relative, source_ext);
            match self.cache.invalidate(&identity) {
                Ok(true) => report.invalidated += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("failed to invalidate artifact for {identity}: {e}");
                    report.failed += 1;
                }
            }
            ignore.push(relative);
        }

        report.ignored = ignore.len();
        report.ignore_list = self.cache.write_ignore_list(&ignore)?;

        for stale in files_with_extension(&self.layout.staging_dir, &self.layout.artifact_ext) {
            match std::fs::remove_file(&stale) {
                Ok(()) => report.stale_removed += 1,
                Err(e) => tracing::warn!("failed to remove {}: {e}", stale.display()),
            }
        }

        tracing::info!(
            ignored = report.ignored,
            invalidated = report.invalidated,
            stale_removed = report.stale_removed,
            "pre-compile finished"
        );
        Ok(report)
    }

    /// Compiles every unit in scope into the artifact cache.
    ///
    /// Does nothing unless `env` is production-like and the
    /// `compile_to_cache` setting is on.
    pub fn run_compile(
        &self,
        env: BuildEnv,
        sink: Option<&dyn LogSink>,
    ) -> Result<BuildSummary, BuildError> {
        self.run_compile_with_cancel(env, sink, &CancelToken::new())
    }

    /// Like [`run_compile`](Self::run_compile), stopping between units once
    /// `cancel` fires.
    pub fn run_compile_with_cancel(
        &self,
        env: BuildEnv,
        sink: Option<&dyn LogSink>,
        cancel: &CancelToken,
    ) -> Result<BuildSummary, BuildError> {
        if !env.is_production_like() {
            tracing::debug!(%env, "not a production build, skipping compile");
            return Ok(BuildSummary::default());
        }
        if !self.settings.compile_to_cache()? {
            tracing::debug!("compile to cache disabled, skipping compile");
            return Ok(BuildSummary::default());
        }
        self.cache.ensure_root()?;
        let previous = match BuildManifest::load(self.cache.cache_dir()) {
            Ok(previous) => previous,
            Err(e) => {
                tracing::warn!("ignoring previous build manifest: {e}");
                None
            }
        };

        let resolver = SourceResolver::new(
            Some(&self.layout.generated_dir),
            self.declared_roots(env),
            &self.layout.source_ext,
        );
        let mut archives =
            ArchiveLibraryIndex::new(&self.layout.source_ext, &self.layout.metadata_prefix);
        for archive in &self.layout.archives {
            if !archives.register(archive) {
                tracing::debug!(archive = %archive.display(), "duplicate archive ignored");
            }
        }

        let mut ctx = BuildContext {
            service: self.service.as_ref(),
            cache: &self.cache,
            resolver,
            archives,
            tracker: CompilationTracker::new(),
            log: BuildLog::new(sink),
            manifest: BuildManifest::new(env!("CARGO_PKG_VERSION"), env),
            artifact_ext: &self.layout.artifact_ext,
            cancel,
            cancelled: false,
        };

        ctx.dry_pass(&self.layout.entry_points);
        ctx.sweep_roots();
        ctx.sweep_generated();
        ctx.sweep_archives();

        if let Some(previous) = previous {
            ctx.carry_over(previous);
        }
        if let Err(e) = ctx.manifest.save(self.cache.cache_dir()) {
            tracing::warn!("failed to write build manifest: {e}");
        }

        let summary = BuildSummary {
            ran: true,
            compiled: ctx.log.compiled_count(),
            skipped: ctx.log.skipped_count(),
            errors: ctx.log.error_count(),
            cancelled: ctx.cancelled,
            events: ctx.log.take_events(),
            resolved: ctx.tracker.logical_paths(),
        };
        tracing::info!(
            compiled = summary.compiled,
            skipped = summary.skipped,
            errors = summary.errors,
            cancelled = summary.cancelled,
            "compile finished"
        );
        Ok(summary)
    }

    /// Runs pre-compile, then compile.
    pub fn build(
        &self,
        env: BuildEnv,
        sink: Option<&dyn LogSink>,
        cancel: &CancelToken,
    ) -> Result<BuildReport, BuildError> {
        let pre_compile = self.run_pre_compile()?;
        let summary = self.run_compile_with_cancel(env, sink, cancel)?;
        Ok(BuildReport {
            pre_compile,
            summary,
        })
    }

    /// Declared roots followed by vendor directories of the bundles for `env`.
    fn declared_roots(&self, env: BuildEnv) -> Vec<PathBuf> {
        let mut roots = self.layout.roots.clone();
        let Some(provider) = &self.bundles else {
            tracing::warn!("no bundle provider available, building without vendor roots");
            return roots;
        };
        match provider.fetch_all_bundles(env) {
            Ok(bundles) => {
                for bundle in bundles {
                    tracing::debug!(bundle = %bundle.name, dir = %bundle.vendor_dir.display(), "vendor root");
                    roots.push(bundle.vendor_dir);
                }
            }
            Err(e) => tracing::warn!("{e}, building without vendor roots"),
        }
        roots
    }
}

/// State of one compile pass. Also the lazy resolution hook handed to the
/// compiler service.
struct BuildContext<'a> {
    service: &'a dyn CompilerService,
    cache: &'a ArtifactCache,
    resolver: SourceResolver,
    archives: ArchiveLibraryIndex,
    tracker: CompilationTracker,
    log: BuildLog<'a>,
    manifest: BuildManifest,
    artifact_ext: &'a str,
    cancel: &'a CancelToken,
    cancelled: bool,
}

/// Where a compiled unit's bytes go.
enum Destination {
    Cache,
    /// Next to the source file, which is then deleted.
    BesideSource(PathBuf),
}

impl BuildContext<'_> {
    fn should_stop(&mut self) -> bool {
        if !self.cancelled && self.cancel.is_cancelled() {
            tracing::info!("build cancelled");
            self.cancelled = true;
        }
        self.cancelled
    }

    fn dry_pass(&mut self, entry_points: &[String]) {
        for symbol in entry_points {
            if self.should_stop() {
                return;
            }
            if !self.resolve(symbol) {
                tracing::debug!(symbol = %symbol, "entry point not found");
            }
        }
    }

    fn sweep_roots(&mut self) {
        let roots: Vec<_> = self
            .resolver
            .roots()
            .iter()
            .filter(|r| !r.generated)
            .cloned()
            .collect();
        for root in roots {
            for source in self.resolver.sweep(&root) {
                if self.should_stop() {
                    return;
                }
                let logical = source.identity.logical_path().to_string();
                if self.tracker.is_resolved(&source.identity) {
                    self.log.skipped(&logical, "already resolved");
                    continue;
                }
                // A higher-priority root providing the same unit wins; the
                // generated directory's copy is handled by its own sweep.
                let winner = self.resolver.resolve(&source.identity);
                if let Some(winner) = winner.filter(|w| w.root_priority < root.priority) {
                    self.log
                        .skipped(&logical, &format!("shadowed by root {}", winner.root_priority));
                    continue;
                }
                self.tracker.mark_resolved(&source.identity);
                let name = display_relative(&source.relative);
                let origin = UnitOrigin::Root {
                    priority: source.root_priority,
                    path: source.path,
                };
                self.compile(source.identity, origin, &name, Destination::Cache);
            }
        }
    }

    fn sweep_generated(&mut self) {
        let Some(generated) = self.resolver.roots().iter().find(|r| r.generated).cloned() else {
            return;
        };
        for source in self.resolver.sweep(&generated) {
            if self.should_stop() {
                return;
            }
            if !self.tracker.mark_resolved(&source.identity) {
                self.log
                    .skipped(source.identity.logical_path(), "already resolved");
                continue;
            }
            let beside = beside_source(&source.path, self.artifact_ext);
            let name = display_relative(&source.relative);
            let origin = UnitOrigin::Root {
                priority: source.root_priority,
                path: source.path,
            };
            self.compile(source.identity, origin, &name, Destination::BesideSource(beside));
        }
    }

    fn sweep_archives(&mut self) {
        for archive in self.archives.archives() {
            for entry in self.archives.entries(&archive) {
                if self.should_stop() {
                    return;
                }
                let identity = UnitIdentity::from_entry_name(&entry, self.resolver.source_ext());
                if self.tracker.is_resolved(&identity) {
                    self.log.skipped(identity.logical_path(), "already resolved");
                    continue;
                }
                if let Some(existing) = self.cache.read(&identity) {
                    self.log.skipped(identity.logical_path(), "already cached");
                    self.manifest.record(
                        identity.logical_path(),
                        ArtifactRecord {
                            origin: OriginKind::Archive,
                            source: ArchiveEntryRef {
                                archive: archive.clone(),
                                entry: entry.clone(),
                            }
                            .to_string(),
                            checksum: ContentHash::from_bytes(&existing),
                        },
                    );
                    continue;
                }
                self.tracker.mark_resolved(&identity);
                let origin = UnitOrigin::Archive(ArchiveEntryRef {
                    archive: archive.clone(),
                    entry: entry.clone(),
                });
                self.compile(identity, origin, &entry, Destination::Cache);
            }
        }
    }

    /// Keeps the previous build's records for artifacts this build left
    /// untouched: units it never marked whose artifact still matches.
    fn carry_over(&mut self, previous: BuildManifest) {
        let cache = self.cache;
        let tracker = &self.tracker;
        let copied = self.manifest.carry_over(previous, |logical, record| {
            let identity = UnitIdentity::from_symbol(logical);
            !identity.is_empty()
                && !tracker.is_resolved(&identity)
                && cache
                    .read(&identity)
                    .is_some_and(|bytes| ContentHash::from_bytes(&bytes) == record.checksum)
        });
        if copied > 0 {
            tracing::debug!(units = copied, "kept manifest records of untouched artifacts");
        }
    }

    /// Where a unit found by `origin` is written. Generated sources are
    /// compiled beside themselves, however they were reached.
    fn destination_for(&self, origin: &UnitOrigin) -> Destination {
        match origin {
            UnitOrigin::Root { priority, path }
                if self
                    .resolver
                    .roots()
                    .iter()
                    .any(|r| r.generated && r.priority == *priority) =>
            {
                Destination::BesideSource(beside_source(path, self.artifact_ext))
            }
            _ => Destination::Cache,
        }
    }

    /// Finds the unit for `identity`: roots first, then archives.
    fn locate(&mut self, identity: &UnitIdentity) -> Option<(UnitIdentity, UnitOrigin, String)> {
        if let Some(source) = self.resolver.resolve(identity) {
            let name = display_relative(&source.relative);
            let origin = UnitOrigin::Root {
                priority: source.root_priority,
                path: source.path,
            };
            return Some((source.identity, origin, name));
        }
        let entry = self.archives.find_entry(identity)?;
        let found = UnitIdentity::from_entry_name(&entry.entry, self.resolver.source_ext());
        let name = entry.entry.clone();
        Some((found, UnitOrigin::Archive(entry), name))
    }

    fn load(&mut self, origin: &UnitOrigin) -> Result<Vec<u8>, CompileError> {
        match origin {
            UnitOrigin::Root { path, .. } => {
                std::fs::read(path).map_err(|e| CompileError::Source {
                    reason: format!("{}: {e}", path.display()),
                })
            }
            UnitOrigin::Archive(entry) => {
                self.archives
                    .read_entry(entry)
                    .map_err(|e| CompileError::Source {
                        reason: e.to_string(),
                    })
            }
        }
    }

    /// Compiles one already-marked unit and writes its artifact.
    fn compile(
        &mut self,
        identity: UnitIdentity,
        origin: UnitOrigin,
        name: &str,
        destination: Destination,
    ) {
        let logical = identity.logical_path().to_string();
        let bytes = match self.load(&origin) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.log.error(&logical, &e.to_string(), &format!("in {origin}"));
                return;
            }
        };

        let unit = UnitSource {
            identity,
            origin,
            bytes,
        };
        let service = self.service;
        let artifact = match compile_isolated(service, &unit, self) {
            Ok(artifact) => artifact,
            Err(e) => {
                let context = match e.line() {
                    Some(line) => format!("on line {line}"),
                    None => format!("in {}", unit.origin),
                };
                self.log.error(&logical, &e.to_string(), &context);
                return;
            }
        };

        let written = match &destination {
            Destination::Cache => self.cache.store(&unit.identity, &artifact).map(|_| ()),
            Destination::BesideSource(target) => write_artifact_file(target, &artifact),
        };
        if let Err(e) = written {
            self.log.error(&logical, &e.to_string(), &format!("in {}", unit.origin));
            return;
        }

        if let (Destination::BesideSource(_), UnitOrigin::Root { path, .. }) =
            (&destination, &unit.origin)
        {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!("failed to remove compiled source {}: {e}", path.display());
            }
        }

        let kind = match unit.origin {
            UnitOrigin::Root { .. } => OriginKind::Root,
            UnitOrigin::Archive(_) => OriginKind::Archive,
        };
        self.manifest.record(
            &logical,
            ArtifactRecord {
                origin: kind,
                source: unit.origin.to_string(),
                checksum: ContentHash::from_bytes(&artifact),
            },
        );
        self.log.compiled(&logical, name);
    }
}

impl ResolutionHook for BuildContext<'_> {
    fn resolve(&mut self, symbol: &str) -> bool {
        let wanted = UnitIdentity::from_symbol(symbol);
        if wanted.is_empty() {
            return false;
        }
        if self.tracker.is_resolved(&wanted) {
            return true;
        }
        let Some((identity, origin, name)) = self.locate(&wanted) else {
            return false;
        };
        if self.tracker.mark_resolved(&identity) {
            tracing::trace!(unit = %identity, "lazily resolved");
            let destination = self.destination_for(&origin);
            self.compile(identity, origin, &name, destination);
        }
        true
    }
}

fn display_relative(relative: &Path) -> String {
    relative.to_string_lossy().replace('\\', "/")
}

fn beside_source(source: &Path, artifact_ext: &str) -> PathBuf {
    source.with_extension(artifact_ext)
}
