//! Strata CLI: drives bytecode-cache builds for layered projects.
//!
//! Provides `strata precompile` to invalidate stale artifacts, `strata compile`
//! and `strata build` to fill the artifact cache, `strata clean` to empty it,
//! and `strata settings` to toggle persisted build settings.

#![warn(missing_docs)]

mod build;
mod clean;
mod pipeline;
mod settings;

use std::process;

use clap::{ArgAction, Parser, Subcommand};
use strata_common::BuildEnv;
use tracing_subscriber::EnvFilter;

/// Strata: layered bytecode-cache build orchestrator.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Strata bytecode-cache builder")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `strata.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Invalidate cached artifacts of primary sources and write the ignore-list.
    Precompile,
    /// Compile every unit in scope into the artifact cache.
    Compile(BuildArgs),
    /// Pre-compile, then compile.
    Build(BuildArgs),
    /// Remove every cached artifact.
    Clean,
    /// Read or change persisted build settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

/// Arguments for `strata compile` and `strata build`.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Build environment (`dev`, `test` or `prod`). Only `prod` compiles.
    #[arg(short, long, default_value = "prod")]
    pub env: BuildEnv,
}

/// `strata settings` subcommands.
#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print a boolean setting, or `unset`.
    Get {
        /// Setting key, e.g. `compile_to_cache`.
        key: String,
    },
    /// Store a boolean setting.
    Set {
        /// Setting key, e.g. `compile_to_cache`.
        key: String,
        /// `true` or `false`.
        #[arg(action = ArgAction::Set)]
        value: bool,
    },
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Precompile => build::run_precompile(&global),
        Command::Compile(ref args) => build::run_compile(args, &global),
        Command::Build(ref args) => build::run_build(args, &global),
        Command::Clean => clean::run(&global),
        Command::Settings(ref command) => settings::run(command, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the flag-derived level.
fn init_logging(quiet: bool, verbose: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
