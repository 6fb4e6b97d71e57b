//! Per-key generation counters guarding write-back of async results.
//!
//! Issuing a request bumps the key's generation; a result may only be applied
//! when the generation it captured is still the latest one for that key.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque ticket captured when a request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub struct Generations<K> {
    counter: AtomicU64,
    latest: Mutex<HashMap<K, u64>>,
}

impl<K> Default for Generations<K> {
    fn default() -> Self {
        Self {
            counter: AtomicU64::new(1),
            latest: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Copy> Generations<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a new request for `key`, superseding any earlier one.
    pub fn issue(&self, key: K) -> Generation {
        let g = self.counter.fetch_add(1, Ordering::Relaxed);
        self.map().insert(key, g);
        Generation(g)
    }

    pub fn is_current(&self, key: K, generation: Generation) -> bool {
        self.map().get(&key) == Some(&generation.0)
    }

    /// Drops keys for which `keep` is false. A pending result for a dropped
    /// key is no longer current.
    pub fn retain(&self, mut keep: impl FnMut(&K) -> bool) {
        self.map().retain(|k, _| keep(k));
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<K, u64>> {
        // The map holds plain integers; a poisoned lock still has valid data.
        self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_issue_supersedes_older() {
        let g = Generations::new();
        let first = g.issue("p1");
        let second = g.issue("p1");
        assert!(!g.is_current("p1", first));
        assert!(g.is_current("p1", second));
        assert!(second > first);
    }

    #[test]
    fn keys_are_independent() {
        let g = Generations::new();
        let a = g.issue(1u64);
        let _b = g.issue(2u64);
        assert!(g.is_current(1, a));
        assert!(!g.is_current(3, a));
    }

    #[test]
    fn retained_keys_stay_current_and_dropped_ones_do_not() {
        let g = Generations::new();
        let a = g.issue(1u64);
        let b = g.issue(2u64);
        g.retain(|k| *k != 2);
        assert_eq!(g.len(), 1);
        assert!(g.is_current(1, a));
        assert!(!g.is_current(2, b));
    }
}
