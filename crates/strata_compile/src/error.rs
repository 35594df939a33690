//! Build-level errors.

use strata_cache::CacheError;
use strata_config::ConfigError;

/// Errors that abort a whole build.
///
/// Per-unit failures never surface here; they are logged as events and the
/// build carries on.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The cache root could not be created or the ignore-list could not be
    /// written.
    #[error("artifact cache error: {0}")]
    Cache(#[from] CacheError),

    /// Build settings could not be read.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A build is already running for this project.
    #[error("a build is already running")]
    Busy,

    /// The background build worker has stopped.
    #[error("build worker is not running")]
    WorkerStopped,

    /// The build panicked outside a unit compile.
    #[error("build panicked: {message}")]
    Panicked {
        /// The panic payload, if it was a string.
        message: String,
    },
}
