//! Error types for archive access.

use std::path::PathBuf;

/// Errors raised while opening or reading an archive library.
///
/// None of these abort a build: a missing or unreadable archive simply
/// yields no units.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The registered archive file does not exist.
    #[error("archive {path} does not exist")]
    Missing {
        /// The archive path.
        path: PathBuf,
    },

    /// The archive could not be opened as a zip container.
    #[error("failed to open archive {path}: {reason}")]
    Open {
        /// The archive path.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// An entry could not be extracted.
    #[error("failed to read '{entry}' from {path}: {reason}")]
    Read {
        /// The archive path.
        path: PathBuf,
        /// The entry name.
        entry: String,
        /// Description of the failure.
        reason: String,
    },

    /// The archive was never registered with the index.
    #[error("archive {path} is not registered")]
    NotRegistered {
        /// The archive path.
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_display() {
        let err = ArchiveError::Missing {
            path: PathBuf::from("lib/gui.jar"),
        };
        assert_eq!(err.to_string(), "archive lib/gui.jar does not exist");
    }

    #[test]
    fn read_display() {
        let err = ArchiveError::Read {
            path: PathBuf::from("lib/gui.jar"),
            entry: "php/gui/UXForm.php".to_string(),
            reason: "invalid deflate stream".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("UXForm.php"));
        assert!(msg.contains("invalid deflate stream"));
    }
}
