//! On-disk artifact cache for compiled units.
//!
//! The cache root mirrors source-relative logical paths with the artifact
//! extension. Alongside the artifacts it keeps the ignore-list written by each
//! pre-compile pass and a manifest of what the last compile produced.

#![warn(missing_docs)]

pub mod artifact;
pub mod error;
pub mod ignore;
pub mod manifest;

pub use artifact::{write_artifact_file, ArtifactCache};
pub use error::CacheError;
pub use ignore::{CacheIgnoreList, IGNORE_FILE};
pub use manifest::{ArtifactRecord, BuildManifest, OriginKind, MANIFEST_FILE};
