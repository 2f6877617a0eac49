//! Capacity-bounded key/value store with least-recently-used eviction.
//!
//! The store is not synchronized. Every caller serializes access, usually by
//! holding it behind a `parking_lot::RwLock`.

use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;

/// Called with the key and value of an entry evicted for capacity.
///
/// Runs synchronously while the caller still holds whatever lock guards the
/// store, so it must never re-enter the cache that owns the store.
pub type EvictionCallback<K, V> = Box<dyn FnMut(&K, &V) + Send + Sync>;

/// LRU table with an optional eviction callback.
pub struct BoundedStore<K: Hash + Eq, V> {
    entries: LruCache<K, V>,
    on_evict: Option<EvictionCallback<K, V>>,
}

impl<K: Hash + Eq, V> BoundedStore<K, V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            on_evict: None,
        }
    }

    pub fn with_eviction_callback(capacity: NonZeroUsize, on_evict: EvictionCallback<K, V>) -> Self {
        Self {
            entries: LruCache::new(capacity),
            on_evict: Some(on_evict),
        }
    }

    /// Look up a value and mark it as most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    /// Look up a value without touching recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.peek(key)
    }

    /// Mark an entry as most recently used.
    pub fn promote<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.promote(key);
    }

    /// Insert or replace an entry.
    ///
    /// Returns `true` when the insert pushed the store over capacity and the
    /// least-recently-used entry was evicted. The eviction callback has run by
    /// the time this returns. Replacing an existing key never evicts.
    pub fn add(&mut self, key: K, value: V) -> bool {
        if self.entries.contains(&key) {
            self.entries.put(key, value);
            return false;
        }

        match self.entries.push(key, value) {
            Some((evicted_key, evicted_value)) => {
                if let Some(on_evict) = self.on_evict.as_mut() {
                    on_evict(&evicted_key, &evicted_value);
                }
                true
            }
            None => false,
        }
    }

    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.pop(key).is_some()
    }

    /// Membership test that does not touch recency.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains(key)
    }

    /// Drop every entry. The eviction callback is not invoked: purged entries
    /// are discarded, not evicted.
    pub fn purge(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.entries.cap()
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for BoundedStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedStore")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("has_eviction_callback", &self.on_evict.is_some())
            .finish()
    }
}
