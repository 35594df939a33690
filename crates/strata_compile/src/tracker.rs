//! Build-scoped record of units already resolved.

use std::collections::HashSet;
use std::sync::Mutex;

use strata_common::UnitIdentity;

/// The set of identities compiled (or attempted) during one build.
///
/// Grows monotonically and is never shared between builds. Marking is a
/// single check-and-insert under the lock, so two passes racing on the same
/// identity cannot both win.
#[derive(Debug, Default)]
pub struct CompilationTracker {
    resolved: Mutex<HashSet<UnitIdentity>>,
}

impl CompilationTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `identity` as resolved. Returns `true` if it was not marked before.
    pub fn mark_resolved(&self, identity: &UnitIdentity) -> bool {
        let mut resolved = self.resolved.lock().unwrap_or_else(|e| e.into_inner());
        resolved.insert(identity.clone())
    }

    /// Returns `true` if `identity` has been marked in this build.
    pub fn is_resolved(&self, identity: &UnitIdentity) -> bool {
        let resolved = self.resolved.lock().unwrap_or_else(|e| e.into_inner());
        resolved.contains(identity)
    }

    /// Returns the number of marked identities.
    pub fn len(&self) -> usize {
        self.resolved.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns `true` if nothing has been marked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the logical paths of every marked identity, sorted.
    pub fn logical_paths(&self) -> Vec<String> {
        let resolved = self.resolved.lock().unwrap_or_else(|e| e.into_inner());
        let mut paths: Vec<String> = resolved
            .iter()
            .map(|id| id.logical_path().to_string())
            .collect();
        paths.sort();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn mark_is_insert_if_absent() {
        let tracker = CompilationTracker::new();
        let id = UnitIdentity::from_symbol("app\\Main");
        assert!(tracker.mark_resolved(&id));
        assert!(!tracker.mark_resolved(&id));
        assert!(tracker.is_resolved(&id));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn spellings_share_a_mark() {
        let tracker = CompilationTracker::new();
        tracker.mark_resolved(&UnitIdentity::from_symbol("App\\Forms\\Main"));
        let by_path = UnitIdentity::from_entry_name("app/forms/main.php", "php");
        assert!(tracker.is_resolved(&by_path));
        assert!(!tracker.mark_resolved(&by_path));
    }

    #[test]
    fn empty_tracker() {
        let tracker = CompilationTracker::new();
        assert!(tracker.is_empty());
        assert!(!tracker.is_resolved(&UnitIdentity::from_symbol("x")));
        assert!(tracker.logical_paths().is_empty());
    }

    #[test]
    fn concurrent_marks_have_one_winner() {
        let tracker = Arc::new(CompilationTracker::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || tracker.mark_resolved(&UnitIdentity::from_symbol("a/B")))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(tracker.logical_paths(), ["a/B"]);
    }
}
