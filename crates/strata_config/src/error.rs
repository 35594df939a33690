//! Error types for configuration loading and validation.

use std::path::PathBuf;

/// Errors that can occur when loading a `strata.toml` configuration or
/// reading and writing persisted build settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The settings file could not be written.
    #[error("failed to write settings to {path}: {reason}")]
    SettingsWrite {
        /// The settings file path.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("project.name".to_string());
        assert_eq!(format!("{err}"), "missing required field: project.name");
    }

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError("expected '=' at line 3".to_string());
        assert_eq!(
            format!("{err}"),
            "failed to parse configuration: expected '=' at line 3"
        );
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("source_ext equals artifact_ext".to_string());
        assert_eq!(
            format!("{err}"),
            "validation error: source_ext equals artifact_ext"
        );
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        assert!(format!("{err}").starts_with("failed to read configuration:"));
    }

    #[test]
    fn display_settings_write() {
        let err = ConfigError::SettingsWrite {
            path: PathBuf::from(".strata/settings.toml"),
            reason: "read-only file system".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("settings.toml"));
        assert!(msg.contains("read-only"));
    }
}
