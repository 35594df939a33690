//! `strata clean` removes every cached artifact.

use crate::pipeline::{load_project, make_orchestrator};
use crate::GlobalArgs;

/// Runs the `strata clean` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let orchestrator = make_orchestrator(&project, false)?;
    let removed = orchestrator.clean()?;
    if !global.quiet {
        eprintln!(
            "     Removed {removed} artifact(s) from {}",
            orchestrator.cache().cache_dir().display()
        );
    }
    Ok(0)
}
