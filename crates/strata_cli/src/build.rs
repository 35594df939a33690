//! `strata precompile`, `strata compile` and `strata build`.

use std::sync::Arc;

use strata_compile::{BuildSummary, BuildWorker, LogSink, PreCompileReport};

use crate::pipeline::{load_project, make_orchestrator};
use crate::{BuildArgs, GlobalArgs};

/// Runs the `strata precompile` command.
pub fn run_precompile(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let orchestrator = make_orchestrator(&project, false)?;
    if !global.quiet {
        eprintln!("  Precompiling {}", project.config.project.name);
    }
    let report = orchestrator.run_pre_compile()?;
    print_pre_compile(&report, global);
    Ok(0)
}

/// Runs the `strata compile` command.
///
/// Returns exit code 1 if any unit failed to compile.
pub fn run_compile(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let orchestrator = make_orchestrator(&project, true)?;
    if !global.quiet {
        eprintln!("   Compiling {} ({})", project.config.project.name, args.env);
    }
    let sink = console_sink(global.quiet);
    let summary = orchestrator.run_compile(args.env, Some(&sink))?;
    Ok(print_summary(&summary, &project.config.project.name, global))
}

/// Runs the `strata build` command: pre-compile then compile on the
/// project's build worker.
pub fn run_build(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let orchestrator = Arc::new(make_orchestrator(&project, true)?);
    if !global.quiet {
        eprintln!("    Building {} ({})", project.config.project.name, args.env);
    }

    let worker = BuildWorker::spawn(orchestrator);
    let sink: Arc<dyn LogSink> = Arc::new(console_sink(global.quiet));
    let report = worker.submit(args.env, Some(sink))?.wait();
    worker.shutdown();
    let report = report?;

    print_pre_compile(&report.pre_compile, global);
    Ok(print_summary(&report.summary, &project.config.project.name, global))
}

/// Prints compile lines to stdout. Quiet mode keeps only error lines.
fn console_sink(quiet: bool) -> impl Fn(&str) + Send + Sync {
    move |line: &str| {
        if !quiet || line.starts_with("[ERROR]") {
            println!("{line}");
        }
    }
}

fn print_pre_compile(report: &PreCompileReport, global: &GlobalArgs) {
    if global.quiet {
        return;
    }
    eprintln!(
        "     Ignored {} source(s), invalidated {} artifact(s), removed {} stale file(s)",
        report.ignored, report.invalidated, report.stale_removed
    );
    if report.failed > 0 {
        eprintln!("warning: {} artifact(s) could not be invalidated", report.failed);
    }
    if global.verbose {
        eprintln!("     Ignore list {}", report.ignore_list.display());
    }
}

fn print_summary(summary: &BuildSummary, name: &str, global: &GlobalArgs) -> i32 {
    if !summary.ran {
        if !global.quiet {
            eprintln!("     Skipped compile (not a production build, or compile_to_cache is off)");
        }
        return 0;
    }
    if !global.quiet {
        let status = if summary.cancelled { "Cancelled" } else { "Finished" };
        eprintln!(
            "    {status} {name}: {} compiled, {} skipped, {} error(s)",
            summary.compiled, summary.skipped, summary.errors
        );
    }
    if summary.errors > 0 {
        1
    } else {
        0
    }
}
