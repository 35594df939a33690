//! Build orchestration for layered bytecode-cache projects.
//!
//! The [`CompileOrchestrator`] turns a project made of ordered source roots
//! and archive libraries into a directory of compiled artifacts. Each unit is
//! compiled at most once per build; references discovered while compiling are
//! resolved lazily through a [`ResolutionHook`] before the exhaustive sweeps
//! pick up everything else.

#![warn(missing_docs)]

pub mod bundle;
pub mod error;
pub mod log;
pub mod orchestrator;
pub mod service;
pub mod tracker;
pub mod worker;

pub use bundle::{Bundle, BundleError, BundleProvider, ConfigBundleProvider};
pub use error::BuildError;
pub use log::{BuildLog, CompileLogEvent, LogSink, Outcome};
pub use orchestrator::{BuildReport, BuildSummary, CompileOrchestrator, PreCompileReport};
pub use service::{
    compile_isolated, CompileError, CompilerService, NoResolution, ProcessCompiler,
    ResolutionHook, UnitOrigin, UnitSource, REFERENCE_MARKER,
};
pub use tracker::CompilationTracker;
pub use worker::{BuildTicket, BuildWorker, CancelToken};
