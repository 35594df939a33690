//! Parsing and validation of `strata.toml` project configuration files.
//!
//! This crate reads the project configuration, resolves it into absolute
//! directories ([`ProjectLayout`]), and persists user-toggled build settings
//! through a [`SettingsStore`].

#![warn(missing_docs)]

pub mod error;
pub mod layout;
pub mod loader;
pub mod settings;
pub mod types;

pub use error::ConfigError;
pub use layout::ProjectLayout;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use settings::{FileSettingsStore, MemorySettingsStore, SettingsStore, COMPILE_TO_CACHE};
pub use types::*;
