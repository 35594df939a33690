//! The pluggable single-unit compiler and the isolation boundary around it.
//!
//! A [`CompilerService`] turns one unit's source bytes into artifact bytes.
//! While it runs it may report symbols the unit references through a
//! [`ResolutionHook`]; the build answers by compiling those units
//! synchronously, before the referencing unit's result is stored.

use std::any::Any;
use std::fmt;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use strata_common::UnitIdentity;
use strata_resolve::ArchiveEntryRef;

/// Prefix of compiler stderr lines that report a referenced symbol.
pub const REFERENCE_MARKER: &str = "@ref ";

/// Where a unit's source came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOrigin {
    /// A file under a source root.
    Root {
        /// Priority of the providing root.
        priority: usize,
        /// Absolute path of the source file.
        path: PathBuf,
    },
    /// An entry inside an archive library.
    Archive(ArchiveEntryRef),
}

impl fmt::Display for UnitOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitOrigin::Root { path, .. } => write!(f, "{}", path.display()),
            UnitOrigin::Archive(entry) => write!(f, "{entry}"),
        }
    }
}

/// One unit ready for compilation.
#[derive(Debug, Clone)]
pub struct UnitSource {
    /// The unit identity.
    pub identity: UnitIdentity,
    /// Where the bytes came from.
    pub origin: UnitOrigin,
    /// Raw source bytes.
    pub bytes: Vec<u8>,
}

/// Callback a compiler service invokes for each symbol a unit references.
pub trait ResolutionHook {
    /// Asks the build to make `symbol` available.
    ///
    /// Returns `true` if the symbol is (now) resolved, `false` if no root
    /// or archive provides it. A miss is not an error.
    fn resolve(&mut self, symbol: &str) -> bool;
}

/// A hook that resolves nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResolution;

impl ResolutionHook for NoResolution {
    fn resolve(&mut self, _symbol: &str) -> bool {
        false
    }
}

/// Why a single unit failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// The compiler rejected the unit.
    #[error("{message}")]
    Rejected {
        /// Compiler message.
        message: String,
        /// Line in the unit the message refers to, if known.
        line: Option<u32>,
    },

    /// The compiler service panicked.
    #[error("compiler panicked: {message}")]
    Panicked {
        /// The panic payload, if it was a string.
        message: String,
    },

    /// The external compiler could not be started or talked to.
    #[error("failed to run compiler '{command}': {reason}")]
    Process {
        /// The configured command.
        command: String,
        /// Description of the failure.
        reason: String,
    },

    /// The unit's bytes could not be obtained.
    #[error("unable to read source: {reason}")]
    Source {
        /// Description of the failure.
        reason: String,
    },
}

impl CompileError {
    /// Creates a [`CompileError::Rejected`] without a line.
    pub fn rejected(message: impl Into<String>) -> Self {
        CompileError::Rejected {
            message: message.into(),
            line: None,
        }
    }

    /// Returns the source line the error refers to, if any.
    pub fn line(&self) -> Option<u32> {
        match self {
            CompileError::Rejected { line, .. } => *line,
            _ => None,
        }
    }
}

/// Compiles one unit to artifact bytes.
pub trait CompilerService: Send + Sync {
    /// Compiles `unit`, reporting referenced symbols to `hook`.
    fn compile_unit(
        &self,
        unit: &UnitSource,
        hook: &mut dyn ResolutionHook,
    ) -> Result<Vec<u8>, CompileError>;
}

/// Runs `service` on `unit`, turning a panic into [`CompileError::Panicked`].
pub fn compile_isolated(
    service: &dyn CompilerService,
    unit: &UnitSource,
    hook: &mut dyn ResolutionHook,
) -> Result<Vec<u8>, CompileError> {
    panic::catch_unwind(AssertUnwindSafe(|| service.compile_unit(unit, hook))).unwrap_or_else(
        |payload| {
            Err(CompileError::Panicked {
                message: panic_message(payload.as_ref()),
            })
        },
    )
}

/// Extracts the message of a caught panic.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// A [`CompilerService`] that runs an external command once per unit.
///
/// The unit source is written to the child's stdin and the artifact is read
/// from its stdout. Each stderr line starting with `@ref ` names a referenced
/// symbol; these are passed to the hook after the child exits successfully.
/// A non-zero exit is a rejection whose message is the remaining stderr; a
/// trailing `:<line>` on the last stderr line is taken as the line number.
///
/// The child sees the unit's logical path in `STRATA_UNIT`.
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    command: String,
    args: Vec<String>,
}

impl ProcessCompiler {
    /// Creates a compiler invoking `command` with `args`.
    pub fn new(command: &str, args: &[String]) -> Self {
        Self {
            command: command.to_string(),
            args: args.to_vec(),
        }
    }

    fn process_err(&self, reason: impl fmt::Display) -> CompileError {
        CompileError::Process {
            command: self.command.clone(),
            reason: reason.to_string(),
        }
    }
}

impl CompilerService for ProcessCompiler {
    fn compile_unit(
        &self,
        unit: &UnitSource,
        hook: &mut dyn ResolutionHook,
    ) -> Result<Vec<u8>, CompileError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .env("STRATA_UNIT", unit.identity.logical_path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.process_err(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.process_err("stdin not captured"))?;
        let bytes = unit.bytes.clone();
        let writer = std::thread::spawn(move || stdin.write_all(&bytes));

        let output = child.wait_with_output().map_err(|e| self.process_err(e))?;
        match writer.join() {
            Ok(Ok(())) => {}
            // The child may exit without draining stdin; its status decides.
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(self.process_err(e)),
            Err(_) => return Err(self.process_err("stdin writer panicked")),
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let (references, diagnostics) = split_stderr(&stderr);

        if !output.status.success() {
            return Err(rejection(&diagnostics, output.status.code()));
        }

        for symbol in references {
            if !hook.resolve(symbol) {
                tracing::debug!(unit = %unit.identity, symbol, "reference not found");
            }
        }
        Ok(output.stdout)
    }
}

fn split_stderr(stderr: &str) -> (Vec<&str>, Vec<&str>) {
    let mut references = Vec::new();
    let mut diagnostics = Vec::new();
    for line in stderr.lines() {
        match line.strip_prefix(REFERENCE_MARKER) {
            Some(symbol) if !symbol.trim().is_empty() => references.push(symbol.trim()),
            Some(_) => {}
            None if line.trim().is_empty() => {}
            None => diagnostics.push(line),
        }
    }
    (references, diagnostics)
}

fn rejection(diagnostics: &[&str], code: Option<i32>) -> CompileError {
    let Some(last) = diagnostics.last() else {
        let message = match code {
            Some(code) => format!("compiler exited with status {code}"),
            None => "compiler terminated by signal".to_string(),
        };
        return CompileError::rejected(message);
    };

    let line = last
        .rsplit_once(':')
        .and_then(|(_, n)| n.trim().parse::<u32>().ok());
    let message = match (line, last.rsplit_once(':')) {
        (Some(_), Some((head, _))) => {
            let mut lines: Vec<&str> = diagnostics[..diagnostics.len() - 1].to_vec();
            lines.push(head);
            lines.join("; ")
        }
        _ => diagnostics.join("; "),
    };
    CompileError::Rejected { message, line }
}
