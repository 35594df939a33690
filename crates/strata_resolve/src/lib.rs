//! Resolution of unit identities to concrete sources.
//!
//! Sources come from ordered filesystem roots ([`SourceResolver`]) and, when no
//! root provides a unit, from archive libraries consulted in registration
//! order ([`ArchiveLibraryIndex`]).

#![warn(missing_docs)]

pub mod archive;
pub mod error;
pub mod source;

pub use archive::{ArchiveEntryRef, ArchiveLibraryIndex};
pub use error::ArchiveError;
pub use source::{files_with_extension, SourcePath, SourceResolver, SourceRoot};
