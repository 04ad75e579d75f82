//! Frontier registry - visited/in-flight dedup for the crawl
//!
//! The frontier is the single dedup gate of the crawl: a ref may be claimed
//! for expansion exactly once per run, no matter how many concurrent tasks
//! discover it.

use std::collections::HashMap;
use std::sync::Mutex;

/// State of a claimed frontier entry
///
/// Absence from the table means the ref is unseen. Transitions are
/// monotonic: unseen → in-flight → visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefState {
    /// Claimed by a task that has not reached its terminal state yet
    InFlight,
    /// Processed (successfully or not); never reprocessed this run
    Visited,
}

/// Thread-safe visited/in-flight registry with exclusive-claim semantics
#[derive(Debug, Default)]
pub struct FrontierStore {
    entries: Mutex<HashMap<String, RefState>>,
}

impl FrontierStore {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims a ref for expansion
    ///
    /// Returns true and marks the ref in-flight iff it was unseen. The
    /// check and the insert happen under one lock acquisition, so exactly
    /// one of any number of concurrent claimants wins.
    pub fn try_claim(&self, reference: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(reference) {
            return false;
        }
        entries.insert(reference.to_string(), RefState::InFlight);
        true
    }

    /// Marks a claimed ref visited
    ///
    /// Called exactly once per successfully claimed ref, whether or not
    /// the associated work succeeded; a node that exhausted its retries
    /// stays blacklisted for the rest of the run.
    pub fn release(&self, reference: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(reference.to_string(), RefState::Visited);
    }

    /// Returns true if the ref is in-flight or visited
    ///
    /// Cheap pre-claim filter; `try_claim` remains the only gate.
    pub fn is_known(&self, reference: &str) -> bool {
        self.entries.lock().unwrap().contains_key(reference)
    }

    /// Number of refs that reached the visited state
    pub fn visited_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap()
            .values()
            .filter(|state| **state == RefState::Visited)
            .count()
    }

    /// Number of refs ever claimed (in-flight + visited)
    pub fn known_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_claim_once() {
        let frontier = FrontierStore::new();
        assert!(frontier.try_claim("Category:A"));
        assert!(!frontier.try_claim("Category:A"));
        assert!(frontier.is_known("Category:A"));
        assert_eq!(frontier.known_count(), 1);
    }

    #[test]
    fn test_release_marks_visited() {
        let frontier = FrontierStore::new();
        assert!(frontier.try_claim("Category:A"));
        assert_eq!(frontier.visited_count(), 0);

        frontier.release("Category:A");
        assert_eq!(frontier.visited_count(), 1);

        // Visited refs can never be claimed again
        assert!(!frontier.try_claim("Category:A"));
    }

    #[test]
    fn test_distinct_refs_are_independent() {
        let frontier = FrontierStore::new();
        assert!(frontier.try_claim("Category:A"));
        assert!(frontier.try_claim("Category:B"));
        assert_eq!(frontier.known_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_claims_have_one_winner() {
        let frontier = Arc::new(FrontierStore::new());

        let mut handles = Vec::new();
        for _ in 0..64 {
            let frontier = Arc::clone(&frontier);
            handles.push(tokio::spawn(async move {
                frontier.try_claim("Category:Contested")
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(frontier.known_count(), 1);
    }
}
