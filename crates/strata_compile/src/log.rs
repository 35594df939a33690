//! Per-unit build events and the user-facing log line stream.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Receives human-readable build log lines.
///
/// Any `Fn(&str)` closure is a sink, so callers can forward lines to a
/// console, an IDE panel, or a test vector.
pub trait LogSink: Send + Sync {
    /// Handles one complete line (no trailing newline).
    fn line(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn line(&self, line: &str) {
        self(line)
    }
}

/// What happened to one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The unit was compiled and its artifact written.
    Compiled,
    /// The unit was passed over: already resolved, shadowed, or cached.
    Skipped,
    /// Compilation or artifact output failed.
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Compiled => "compiled",
            Outcome::Skipped => "skipped",
            Outcome::Error => "error",
        };
        f.write_str(s)
    }
}

/// One per-unit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileLogEvent {
    /// Logical path of the unit.
    pub identity: String,
    /// The outcome.
    pub outcome: Outcome,
    /// Source name for compiled units, reason for skipped units, error
    /// message for failures.
    pub message: String,
}

/// Accumulates [`CompileLogEvent`]s for one build and forwards log lines to
/// an optional [`LogSink`].
///
/// Counts are kept atomically alongside the event vector so summaries never
/// need to walk it.
pub struct BuildLog<'a> {
    events: Mutex<Vec<CompileLogEvent>>,
    compiled: AtomicUsize,
    skipped: AtomicUsize,
    errors: AtomicUsize,
    sink: Option<&'a dyn LogSink>,
}

impl<'a> BuildLog<'a> {
    /// Creates an empty log. `None` means silent.
    pub fn new(sink: Option<&'a dyn LogSink>) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            compiled: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            sink,
        }
    }

    /// Records a compiled unit and emits `:compile <name>`.
    pub fn compiled(&self, identity: &str, name: &str) {
        self.compiled.fetch_add(1, Ordering::Relaxed);
        self.emit_line(&format!(":compile {name}"));
        self.push(identity, Outcome::Compiled, name.to_string());
    }

    /// Records a skipped unit. Nothing is written to the sink.
    pub fn skipped(&self, identity: &str, reason: &str) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(unit = identity, reason, "skipped");
        self.push(identity, Outcome::Skipped, reason.to_string());
    }

    /// Records a failure and emits
    /// `[ERROR] Unable to compile '<identity>', <message>, <context>`.
    pub fn error(&self, identity: &str, message: &str, context: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        self.emit_line(&format!(
            "[ERROR] Unable to compile '{identity}', {message}, {context}"
        ));
        self.push(identity, Outcome::Error, message.to_string());
    }

    /// Returns the number of compiled units.
    pub fn compiled_count(&self) -> usize {
        self.compiled.load(Ordering::Relaxed)
    }

    /// Returns the number of skipped units.
    pub fn skipped_count(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Returns the number of failed units.
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of every event in emission order.
    pub fn events(&self) -> Vec<CompileLogEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Takes all events, leaving the log empty. Counts are not reset.
    pub fn take_events(&self) -> Vec<CompileLogEvent> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *events)
    }

    fn push(&self, identity: &str, outcome: Outcome, message: String) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(CompileLogEvent {
            identity: identity.to_string(),
            outcome,
            message,
        });
    }

    fn emit_line(&self, line: &str) {
        if let Some(sink) = self.sink {
            sink.line(line);
        }
    }
}

impl fmt::Debug for BuildLog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildLog")
            .field("compiled", &self.compiled_count())
            .field("skipped", &self.skipped_count())
            .field("errors", &self.error_count())
            .field("silent", &self.sink.is_none())
            .finish()
    }
}
