//! The cache ignore-list.
//!
//! Pre-compile writes the relative path of every source it is about to
//! rebuild before any unit is compiled. If the build crashes half-way the
//! file remains as a record of the intended scope.

use std::path::Path;

/// File name of the ignore-list inside the cache root.
pub const IGNORE_FILE: &str = ".cacheignore";

/// Newline-separated relative source paths scheduled for recompilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheIgnoreList {
    entries: Vec<String>,
}

impl CacheIgnoreList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a relative path, normalizing separators to `/`.
    pub fn push(&mut self, relative: &Path) {
        self.entries
            .push(relative.to_string_lossy().replace('\\', "/"));
    }

    /// Returns the entries in insertion order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the on-disk form: entries joined by `\n`, no trailing newline.
    pub fn to_file_contents(&self) -> String {
        self.entries.join("\n")
    }

    /// Parses the on-disk form, skipping blank lines.
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self { entries }
    }
}

impl FromIterator<String> for CacheIgnoreList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn push_normalizes_separators() {
        let mut list = CacheIgnoreList::new();
        list.push(Path::new("app\\forms\\Main.php"));
        list.push(&PathBuf::from("app").join("Boot.php"));
        assert_eq!(list.entries(), ["app/forms/Main.php", "app/Boot.php"]);
    }

    #[test]
    fn file_contents_are_newline_joined() {
        let list: CacheIgnoreList = ["a.php".to_string(), "b/c.php".to_string()]
            .into_iter()
            .collect();
        assert_eq!(list.to_file_contents(), "a.php\nb/c.php");
    }

    #[test]
    fn parse_skips_blank_lines() {
        let list = CacheIgnoreList::parse("a.php\n\n  b.php  \r\n");
        assert_eq!(list.entries(), ["a.php", "b.php"]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn empty_list() {
        let list = CacheIgnoreList::new();
        assert!(list.is_empty());
        assert_eq!(list.to_file_contents(), "");
        assert!(CacheIgnoreList::parse("").is_empty());
    }
}
