//! Content hashing for unit identities and artifact checksums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit hash computed using XXH3.
///
/// Used both to key compilation units by their normalized logical path and to
/// checksum artifact payloads recorded in the build manifest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Computes a hash of a string's UTF-8 bytes.
    pub fn from_str_bytes(s: &str) -> Self {
        Self::from_bytes(s.as_bytes())
    }

    /// Returns the first eight hex digits, enough to tell units apart in logs.
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({}..)", self.short())
    }
}
