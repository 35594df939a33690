//! Normalized identities for compilation units.
//!
//! A unit can be named by a filesystem path relative to a source root
//! (`app/forms/MainForm.php`), by an archive entry name, or by the symbol a
//! running unit references (`app\forms\MainForm`). All three spellings must
//! collapse to the same identity so a unit is compiled at most once per build.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::hash::ContentHash;

/// The identity of one logical compilation unit.
///
/// Equality and hashing use only the hash of the lowercased normalized path,
/// so identities are insensitive to case and path separator style. The
/// original-case logical path is kept alongside to name artifacts on disk.
#[derive(Clone)]
pub struct UnitIdentity {
    hash: ContentHash,
    logical: String,
}

impl UnitIdentity {
    /// Creates an identity from a referenced symbol such as `app\forms\MainForm`.
    pub fn from_symbol(symbol: &str) -> Self {
        Self::from_logical(normalize_logical_path(symbol, None))
    }

    /// Creates an identity from a source file path relative to its root.
    ///
    /// The `source_ext` extension is stripped so `a/B.php` and the symbol
    /// `a\B` produce the same identity.
    pub fn from_relative_path(relative: &Path, source_ext: &str) -> Self {
        let raw = relative.to_string_lossy();
        Self::from_logical(normalize_logical_path(&raw, Some(source_ext)))
    }

    /// Creates an identity from an archive entry name (always `/`-separated).
    pub fn from_entry_name(entry: &str, source_ext: &str) -> Self {
        Self::from_logical(normalize_logical_path(entry, Some(source_ext)))
    }

    fn from_logical(logical: String) -> Self {
        let hash = ContentHash::from_str_bytes(&logical.to_ascii_lowercase());
        Self { hash, logical }
    }

    /// Returns the identity hash.
    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    /// Returns the normalized logical path: `/`-separated, no extension,
    /// original case.
    pub fn logical_path(&self) -> &str {
        &self.logical
    }

    /// Returns the logical path split into its `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.logical.split('/')
    }

    /// Returns `true` if the normalized path is empty (for example a bare `/`).
    pub fn is_empty(&self) -> bool {
        self.logical.is_empty()
    }
}

impl PartialEq for UnitIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for UnitIdentity {}

impl Hash for UnitIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Display for UnitIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.logical)
    }
}

impl fmt::Debug for UnitIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitIdentity({} #{})", self.logical, self.hash.short())
    }
}

/// Normalizes a unit path or symbol into its logical form.
///
/// Backslashes become `/`, empty and `.` segments are dropped, and a trailing
/// `.<source_ext>` (matched case-insensitively) is removed. Case is preserved;
/// identities lowercase only when hashing.
///
/// A path with a `..` segment normalizes to the empty string: a logical path
/// always stays below the directory it is joined to.
pub fn normalize_logical_path(raw: &str, source_ext: Option<&str>) -> String {
    let unified = raw.replace('\\', "/");
    let segments: Vec<&str> = unified
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect();
    if segments.contains(&"..") {
        return String::new();
    }
    let mut joined = segments.join("/");

    if let Some(ext) = source_ext {
        let suffix_len = ext.len() + 1;
        if joined.len() > suffix_len {
            let split = joined.len() - suffix_len;
            let has_ext = joined.is_char_boundary(split)
                && joined[split..].starts_with('.')
                && joined[split + 1..].eq_ignore_ascii_case(ext);
            if has_ext {
                joined.truncate(split);
            }
        }
    }

    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    #[test]
    fn symbol_and_path_collapse() {
        let from_symbol = UnitIdentity::from_symbol("App\\Forms\\MainForm");
        let from_path = UnitIdentity::from_relative_path(Path::new("app/forms/mainform.php"), "php");
        assert_eq!(from_symbol, from_path);
    }

    #[test]
    fn entry_name_matches_path() {
        let entry = UnitIdentity::from_entry_name("lib/Util.PHP", "php");
        let path = UnitIdentity::from_relative_path(&PathBuf::from("lib").join("util.php"), "php");
        assert_eq!(entry, path);
        assert_eq!(entry.logical_path(), "lib/Util");
    }

    #[test]
    fn logical_path_keeps_case() {
        let id = UnitIdentity::from_symbol("\\app\\Forms\\MainForm");
        assert_eq!(id.logical_path(), "app/Forms/MainForm");
        assert_eq!(id.to_string(), "app/Forms/MainForm");
        assert_eq!(id.segments().collect::<Vec<_>>(), ["app", "Forms", "MainForm"]);
    }

    #[test]
    fn different_units_differ() {
        let a = UnitIdentity::from_symbol("app/A");
        let b = UnitIdentity::from_symbol("app/B");
        assert_ne!(a, b);
    }

    #[test]
    fn hash_set_dedups_spellings() {
        let mut set = HashSet::new();
        set.insert(UnitIdentity::from_symbol("a\\B"));
        set.insert(UnitIdentity::from_symbol("A/b"));
        set.insert(UnitIdentity::from_entry_name("a/b.php", "php"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn normalize_drops_empty_and_dot_segments() {
        assert_eq!(normalize_logical_path("./a//b/./c", None), "a/b/c");
        assert_eq!(normalize_logical_path("/a/b/", None), "a/b");
    }

    #[test]
    fn normalize_strips_only_the_source_extension() {
        assert_eq!(normalize_logical_path("a/b.php", Some("php")), "a/b");
        assert_eq!(normalize_logical_path("a/b.phb", Some("php")), "a/b.phb");
        assert_eq!(normalize_logical_path("a/b.php", None), "a/b.php");
        assert_eq!(normalize_logical_path(".php", Some("php")), ".php");
    }

    #[test]
    fn parent_segments_empty_the_path() {
        assert_eq!(normalize_logical_path("../../escaped.php", Some("php")), "");
        assert_eq!(normalize_logical_path("a\\..\\..\\x", None), "");
        assert!(UnitIdentity::from_symbol("../../x").is_empty());
        assert!(UnitIdentity::from_entry_name("lib/../../Evil.php", "php").is_empty());
        assert_eq!(normalize_logical_path("a/..b/c", None), "a/..b/c");
    }

    #[test]
    fn empty_identity() {
        assert!(UnitIdentity::from_symbol("/").is_empty());
        assert!(!UnitIdentity::from_symbol("a").is_empty());
    }
}
