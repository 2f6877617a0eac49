//! Secondary indexes from a coarse key to the fine keys resident in a cache.
//!
//! An index answers "which cache entries belong to api 7" so that a single
//! notification can drop exactly those entries. Entries the cache evicts on
//! its own are reported through an [`EvictionSink`] and drained the next time
//! the index takes its write lock.
//!
//! Lock order: the slot lock is taken before the eviction log. The eviction
//! log is a leaf and nothing is acquired while holding it.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use tracing::trace;

type Slots<C, F> = HashMap<C, HashSet<F>>;

/// Write end of an index's eviction log. Safe to call from a store eviction
/// callback.
pub struct EvictionSink<C, F> {
    log: Arc<Mutex<Vec<(C, F)>>>,
}

impl<C, F> EvictionSink<C, F> {
    pub fn record(&self, coarse: C, fine: F) {
        self.log.lock().push((coarse, fine));
    }
}

impl<C, F> Clone for EvictionSink<C, F> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
        }
    }
}

/// Coarse key → set of fine keys.
pub struct SecondaryIndex<C, F> {
    name: &'static str,
    slots: RwLock<Slots<C, F>>,
    evicted: Arc<Mutex<Vec<(C, F)>>>,
}

impl<C, F> SecondaryIndex<C, F>
where
    C: Hash + Eq + Clone + Debug,
    F: Hash + Eq + Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: RwLock::new(HashMap::new()),
            evicted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn eviction_sink(&self) -> EvictionSink<C, F> {
        EvictionSink {
            log: Arc::clone(&self.evicted),
        }
    }

    /// Track `fine` under `coarse`.
    pub fn insert(&self, coarse: C, fine: F) {
        self.write().entry(coarse).or_default().insert(fine);
    }

    /// Remove and return every fine key tracked under `coarse`. An untracked
    /// key yields an empty set.
    pub fn take(&self, coarse: &C) -> HashSet<F> {
        self.write().remove(coarse).unwrap_or_default()
    }

    /// Stop tracking one fine key. Returns whether it was tracked.
    pub fn detach(&self, coarse: &C, fine: &F) -> bool {
        let mut slots = self.write();
        detach_from(&mut slots, coarse, fine)
    }

    /// Fine keys tracked under `coarse`.
    pub fn keys(&self, coarse: &C) -> Vec<F> {
        self.write()
            .get(coarse)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of fine keys tracked under `coarse`.
    pub fn len(&self, coarse: &C) -> usize {
        self.write().get(coarse).map_or(0, HashSet::len)
    }

    /// Number of coarse keys with at least one fine key.
    pub fn slot_count(&self) -> usize {
        self.write().len()
    }

    /// Total number of fine keys across all slots.
    pub fn tracked_keys(&self) -> usize {
        self.write().values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slot_count() == 0
    }

    /// Drop every slot and any pending evictions.
    pub fn clear(&self) {
        let mut slots = self.slots.write();
        self.evicted.lock().clear();
        slots.clear();
    }

    /// Apply pending evictions now.
    pub fn prune(&self) {
        drop(self.write());
    }

    /// Take the slot lock and apply pending evictions before returning it.
    fn write(&self) -> RwLockWriteGuard<'_, Slots<C, F>> {
        let mut slots = self.slots.write();
        let pending = std::mem::take(&mut *self.evicted.lock());
        if !pending.is_empty() {
            trace!(index = self.name, count = pending.len(), "Draining evicted keys from index");
            for (coarse, fine) in &pending {
                detach_from(&mut slots, coarse, fine);
            }
        }
        slots
    }
}

fn detach_from<C, F>(slots: &mut Slots<C, F>, coarse: &C, fine: &F) -> bool
where
    C: Hash + Eq,
    F: Hash + Eq,
{
    let Some(set) = slots.get_mut(coarse) else {
        return false;
    };
    let removed = set.remove(fine);
    if set.is_empty() {
        slots.remove(coarse);
    }
    removed
}

impl<C, F> Debug for SecondaryIndex<C, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecondaryIndex")
            .field("name", &self.name)
            .field("slots", &self.slots.read().len())
            .field("pending_evictions", &self.evicted.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut keys: Vec<i64>) -> Vec<i64> {
        keys.sort_unstable();
        keys
    }

    #[test]
    fn test_insert_and_take() {
        let index: SecondaryIndex<i64, i64> = SecondaryIndex::new("plan_account_ids");
        index.insert(1, 10);
        index.insert(1, 11);
        index.insert(1, 11);
        index.insert(2, 20);

        assert_eq!(index.len(&1), 2);
        assert_eq!(index.tracked_keys(), 3);
        assert_eq!(sorted(index.keys(&1)), vec![10, 11]);

        let taken = index.take(&1);
        assert_eq!(taken.len(), 2);
        assert_eq!(index.len(&1), 0);
        assert_eq!(index.slot_count(), 1);
        assert!(index.take(&99).is_empty());
    }

    #[test]
    fn test_detach_drops_empty_slot() {
        let index: SecondaryIndex<i64, String> = SecondaryIndex::new("api_hostnames");
        index.insert(1, "a.example.com".into());

        assert!(index.detach(&1, &"a.example.com".to_string()));
        assert!(!index.detach(&1, &"a.example.com".to_string()));
        assert!(index.is_empty());
    }

    #[test]
    fn test_evictions_drain_on_next_write() {
        let index: SecondaryIndex<i64, i64> = SecondaryIndex::new("api_endpoint_ids");
        let sink = index.eviction_sink();
        index.insert(1, 100);
        index.insert(1, 101);

        sink.record(1, 100);
        sink.record(5, 500);
        assert_eq!(sorted(index.keys(&1)), vec![101]);

        sink.record(1, 101);
        index.prune();
        assert!(index.is_empty());
    }

    #[test]
    fn test_reinsert_after_eviction_is_kept() {
        let index: SecondaryIndex<i64, i64> = SecondaryIndex::new("api_endpoint_ids");
        let sink = index.eviction_sink();
        index.insert(1, 100);
        sink.record(1, 100);
        index.insert(1, 100);

        assert_eq!(index.keys(&1), vec![100]);
    }

    #[test]
    fn test_clear_discards_pending_evictions() {
        let index: SecondaryIndex<i64, i64> = SecondaryIndex::new("plan_account_ids");
        let sink = index.eviction_sink();
        index.insert(1, 1);
        sink.record(1, 1);
        index.clear();
        index.clear();

        assert!(index.is_empty());
        assert_eq!(index.tracked_keys(), 0);
    }
}
