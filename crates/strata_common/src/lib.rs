//! Shared foundational types used across the Strata build orchestrator.
//!
//! This crate provides content hashing, normalized compilation-unit identities,
//! and the build environment enum consulted before a production compile.

#![warn(missing_docs)]

pub mod env;
pub mod hash;
pub mod identity;

pub use env::{BuildEnv, ParseBuildEnvError};
pub use hash::ContentHash;
pub use identity::{normalize_logical_path, UnitIdentity};
