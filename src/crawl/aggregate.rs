//! Concurrent category → member-page accumulator
//!
//! Tasks record (aggregation key, member) pairs as they discover them; the
//! pipeline reads the map only after the crawl reaches quiescence.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

/// Concurrent-safe multimap from aggregation key to member page names
#[derive(Debug, Default)]
pub struct ResultAggregator {
    map: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl ResultAggregator {
    /// Creates an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one (key, member) association
    ///
    /// Idempotent set-union insert; safe under concurrent calls from any
    /// number of tasks.
    pub fn record(&self, key: &str, member: &str) {
        let mut map = self.map.lock().unwrap();
        map.entry(key.to_string())
            .or_default()
            .insert(member.to_string());
    }

    /// Clones the accumulated map
    ///
    /// Meaningful only once the run is quiescent (or explicitly finalized
    /// on failure); callers sequence that themselves.
    pub fn snapshot(&self) -> HashMap<String, BTreeSet<String>> {
        self.map.lock().unwrap().clone()
    }

    /// Deduplicated union of all keys and all members, sorted ascending by
    /// codepoint
    ///
    /// This exact ordering feeds the export request and the manifest
    /// artifact, so downstream output is reproducible.
    pub fn flatten(&self) -> Vec<String> {
        let map = self.map.lock().unwrap();
        let mut union = BTreeSet::new();
        for (key, members) in map.iter() {
            union.insert(key.clone());
            for member in members {
                union.insert(member.clone());
            }
        }
        union.into_iter().collect()
    }

    /// Number of distinct (key, member) pairs recorded
    pub fn recorded_count(&self) -> usize {
        self.map.lock().unwrap().values().map(BTreeSet::len).sum()
    }
}
