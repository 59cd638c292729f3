//! Sample store used to exercise the harness in benchmarks.

use dashmap::DashMap;

use cinder_common::HarnessResult;
use cinder_harness::fixture::KvStore;

use crate::utils::value_for;

/// Concurrent in-memory store keyed by logical index.
///
/// Stands in for a PMem store when the harness itself is the thing being
/// measured; its operations are intentionally trivial so harness overhead
/// dominates.
#[derive(Default)]
pub struct MapStore {
    entries: DashMap<u64, u64>,
}

impl MapStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MapStore {
    fn insert(&self, start_idx: u64, end_idx: u64) -> HarnessResult<u64> {
        for idx in start_idx..end_idx {
            self.entries.insert(idx, value_for(idx));
        }
        Ok(end_idx - start_idx)
    }

    fn find(&self, start_idx: u64, end_idx: u64) -> HarnessResult<u64> {
        let mut found = 0;
        for idx in start_idx..end_idx {
            if self
                .entries
                .get(&idx)
                .is_some_and(|v| *v == value_for(idx))
            {
                found += 1;
            }
        }
        Ok(found)
    }

    fn update(&self, start_idx: u64, end_idx: u64) -> HarnessResult<u64> {
        for idx in start_idx..end_idx {
            self.entries.insert(idx, value_for(idx).wrapping_add(1));
        }
        Ok(end_idx - start_idx)
    }

    fn delete(&self, start_idx: u64, end_idx: u64) -> HarnessResult<u64> {
        let mut deleted = 0;
        for idx in start_idx..end_idx {
            if self.entries.remove(&idx).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_then_find() {
        let store = MapStore::new();
        assert_eq!(store.insert(0, 100).unwrap(), 100);
        assert_eq!(store.find(0, 100).unwrap(), 100);
        assert_eq!(store.len(), 100);
    }

    #[test]
    fn test_update_invalidates_find() {
        let store = MapStore::new();
        store.insert(0, 10).unwrap();
        store.update(0, 10).unwrap();
        // Updated values no longer match the insert-time derivation.
        assert_eq!(store.find(0, 10).unwrap(), 0);
    }

    #[test]
    fn test_delete() {
        let store = MapStore::new();
        store.insert(0, 10).unwrap();
        assert_eq!(store.delete(0, 5).unwrap(), 5);
        assert_eq!(store.len(), 5);
        assert_eq!(store.delete(0, 10).unwrap(), 5);
        assert!(store.is_empty());
    }
}
