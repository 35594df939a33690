//! The per-project background build thread.
//!
//! Builds are long-running and must not block the caller. A [`BuildWorker`]
//! owns one thread fed by a channel; at most one build is in flight, and a
//! second request while busy is refused rather than queued.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use strata_common::BuildEnv;

use crate::error::BuildError;
use crate::log::LogSink;
use crate::orchestrator::{BuildReport, CompileOrchestrator};
use crate::service::panic_message;

/// Cooperative cancellation flag, checked between units.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. The unit in progress still finishes.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct BuildRequest {
    env: BuildEnv,
    sink: Option<Arc<dyn LogSink>>,
    reply: mpsc::Sender<Result<BuildReport, BuildError>>,
}

/// Handle to a submitted build.
#[derive(Debug)]
pub struct BuildTicket {
    reply: mpsc::Receiver<Result<BuildReport, BuildError>>,
}

impl BuildTicket {
    /// Blocks until the build finishes.
    pub fn wait(self) -> Result<BuildReport, BuildError> {
        self.reply.recv().unwrap_or(Err(BuildError::WorkerStopped))
    }
}

/// A dedicated build thread for one project.
pub struct BuildWorker {
    requests: Option<mpsc::Sender<BuildRequest>>,
    busy: Arc<AtomicBool>,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl BuildWorker {
    /// Starts the worker thread.
    pub fn spawn(orchestrator: Arc<CompileOrchestrator>) -> Self {
        let (tx, rx) = mpsc::channel::<BuildRequest>();
        let busy = Arc::new(AtomicBool::new(false));
        let cancel = CancelToken::new();

        let thread_busy = Arc::clone(&busy);
        let thread_cancel = cancel.clone();
        let handle = std::thread::spawn(move || {
            for request in rx {
                let sink = request.sink.as_deref();
                // A panic outside a unit compile fails this build only.
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    orchestrator.build(request.env, sink, &thread_cancel)
                }))
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    tracing::error!("build panicked: {message}");
                    Err(BuildError::Panicked { message })
                });
                thread_busy.store(false, Ordering::SeqCst);
                // The submitter may have dropped its ticket.
                let _ = request.reply.send(result);
            }
            tracing::debug!("build worker stopped");
        });

        Self {
            requests: Some(tx),
            busy,
            cancel,
            handle: Some(handle),
        }
    }

    /// Starts a pre-compile + compile build for `env`.
    ///
    /// Returns [`BuildError::Busy`] if a build is already running.
    pub fn submit(
        &self,
        env: BuildEnv,
        sink: Option<Arc<dyn LogSink>>,
    ) -> Result<BuildTicket, BuildError> {
        let requests = self.requests.as_ref().ok_or(BuildError::WorkerStopped)?;
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BuildError::Busy);
        }
        self.cancel.reset();

        let (reply, rx) = mpsc::channel();
        if requests.send(BuildRequest { env, sink, reply }).is_err() {
            self.busy.store(false, Ordering::SeqCst);
            return Err(BuildError::WorkerStopped);
        }
        Ok(BuildTicket { reply: rx })
    }

    /// Returns `true` while a build is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Cancels the running build, if any.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancels any running build and joins the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.cancel.cancel();
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("build worker panicked");
            }
        }
    }
}

impl Drop for BuildWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
