//! Shared helpers for CLI commands: project discovery and orchestrator setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata_compile::{
    CompileError, CompileOrchestrator, CompilerService, ConfigBundleProvider, ProcessCompiler,
    ResolutionHook, UnitSource,
};
use strata_config::{FileSettingsStore, ProjectConfig, ProjectLayout, CONFIG_FILE};

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing `strata.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        find_project_root(&std::env::current_dir()?)
    }
}

/// A loaded project: its parsed configuration and resolved layout.
pub struct Project {
    /// The parsed `strata.toml`.
    pub config: ProjectConfig,
    /// Directories resolved against the project root.
    pub layout: ProjectLayout,
}

/// Finds and loads the project selected by the global args.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let project_dir = resolve_project_root(global)?;
    let config = strata_config::load_config(&project_dir)?;
    let layout = ProjectLayout::resolve(&project_dir, &config);
    tracing::debug!(
        project = %layout.project_dir.display(),
        roots = layout.roots.len(),
        archives = layout.archives.len(),
        "loaded project"
    );
    Ok(Project { config, layout })
}

/// Returns the settings store of a project.
pub fn settings_store(layout: &ProjectLayout) -> FileSettingsStore {
    FileSettingsStore::new(&layout.settings_path())
}

/// Builds an orchestrator for `project`.
///
/// Commands that only pre-compile or clean never invoke the compiler, so a
/// missing `[compiler]` table is reported only when `need_compiler` is set.
pub fn make_orchestrator(
    project: &Project,
    need_compiler: bool,
) -> Result<CompileOrchestrator, Box<dyn std::error::Error>> {
    let compiler: Arc<dyn CompilerService> = match &project.config.compiler {
        Some(c) => Arc::new(ProcessCompiler::new(&c.command, &c.args)),
        None if need_compiler => {
            return Err(format!("no [compiler] table in {CONFIG_FILE}").into());
        }
        None => Arc::new(Unconfigured),
    };
    let layout = project.layout.clone();
    let bundles = ConfigBundleProvider::new(layout.bundles.clone());
    let settings = settings_store(&layout);
    Ok(CompileOrchestrator::new(layout, Arc::new(settings), compiler)
        .with_bundle_provider(Arc::new(bundles)))
}

/// Stands in for the compiler when the project declares none.
struct Unconfigured;

impl CompilerService for Unconfigured {
    fn compile_unit(
        &self,
        _unit: &UnitSource,
        _hook: &mut dyn ResolutionHook,
    ) -> Result<Vec<u8>, CompileError> {
        Err(CompileError::rejected("no compiler configured"))
    }
}
