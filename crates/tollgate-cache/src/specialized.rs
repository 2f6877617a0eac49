//! Read-through caches over the model data source.
//!
//! Every cache composes a [`BaseCache`] (bounded store, lock, counters) with a
//! loader call on the shared [`ModelDataSource`](tollgate_core::ModelDataSource)
//! and a criteria check. The base never calls the data source itself; it is
//! handed a loader closure per miss.

use std::borrow::Borrow;
use std::fmt::Debug;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

use parking_lot::RwLock;
use tollgate_core::{DynDataSource, Host, Library, Plan, ProxyEndpoint, ProxyEndpointType, SourceResult};
use tracing::{debug, trace};

use crate::criteria::{CacheCriteria, CriteriaKind};
use crate::error::{CacheError, CacheResult};
use crate::stats::{CacheStats, StatsCounters};
use crate::store::{BoundedStore, EvictionCallback};

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    /// Served from memory.
    Hit(V),
    /// Loaded from the data source and stored.
    Loaded(V),
}

impl<V> Lookup<V> {
    pub fn into_value(self) -> V {
        match self {
            Lookup::Hit(v) | Lookup::Loaded(v) => v,
        }
    }

    pub fn value(&self) -> &V {
        match self {
            Lookup::Hit(v) | Lookup::Loaded(v) => v,
        }
    }

    /// Whether the value came from the data source on this call.
    pub fn is_loaded(&self) -> bool {
        matches!(self, Lookup::Loaded(_))
    }
}

/// Capability shared by the specialized caches.
pub trait DataSourceCache: Send + Sync {
    type Value: Clone + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    /// Read-through lookup that also reports whether the data source was hit.
    fn lookup(&self, criteria: &CacheCriteria) -> CacheResult<Lookup<Self::Value>>;

    fn get(&self, criteria: &CacheCriteria) -> CacheResult<Self::Value> {
        self.lookup(criteria).map(Lookup::into_value)
    }

    /// Resident value, without loading and without touching recency.
    fn cached(&self, criteria: &CacheCriteria) -> Option<Self::Value>;

    /// Remove an entry. A criteria of the wrong variant matches nothing.
    fn remove(&self, criteria: &CacheCriteria) -> bool;

    fn contains(&self, criteria: &CacheCriteria) -> bool;

    fn purge(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> CacheStats;
}

/// Locked bounded store plus counters. Shared by every specialized cache.
pub struct BaseCache<K: Hash + Eq, V> {
    name: &'static str,
    store: RwLock<BoundedStore<K, V>>,
    counters: StatsCounters,
}

impl<K, V> BaseCache<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    pub fn new(name: &'static str, capacity: NonZeroUsize) -> Self {
        Self {
            name,
            store: RwLock::new(BoundedStore::new(capacity)),
            counters: StatsCounters::default(),
        }
    }

    pub fn with_eviction_callback(
        name: &'static str,
        capacity: NonZeroUsize,
        on_evict: EvictionCallback<K, V>,
    ) -> Self {
        Self {
            name,
            store: RwLock::new(BoundedStore::with_eviction_callback(capacity, on_evict)),
            counters: StatsCounters::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Return the resident value for `key`, or call `load` and store its
    /// result.
    ///
    /// The loader runs with no lock held. Two concurrent misses on the same
    /// key may both load; the later insert wins. Loader errors are returned
    /// unchanged and nothing is stored.
    pub fn get_or_load<F>(&self, key: K, load: F) -> CacheResult<Lookup<V>>
    where
        F: FnOnce(&K) -> SourceResult<V>,
    {
        let cached = self.store.read().peek(&key).cloned();
        if let Some(value) = cached {
            self.counters.record_hit();
            // Recency is best effort: skip it rather than wait on a writer.
            if let Some(mut store) = self.store.try_write() {
                store.promote(&key);
            }
            return Ok(Lookup::Hit(value));
        }

        self.counters.record_miss();
        trace!(cache = self.name, key = ?key, "Cache miss, loading from data source");

        let value = match load(&key) {
            Ok(value) => value,
            Err(e) => {
                self.counters.record_load_failure();
                debug!(cache = self.name, key = ?key, error = %e, "Cache load failed");
                return Err(CacheError::Source(e));
            }
        };

        let evicted = self.store.write().add(key, value.clone());
        if evicted {
            self.counters.record_eviction();
        }
        Ok(Lookup::Loaded(value))
    }

    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.read().peek(key).cloned()
    }

    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.write().remove(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.read().contains(key)
    }

    pub fn purge(&self) {
        self.store.write().purge();
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.store.read().capacity()
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len())
    }
}

impl<K: Hash + Eq, V> Debug for BaseCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseCache")
            .field("name", &self.name)
            .field("store", &*self.store.read())
            .finish()
    }
}

fn expect_id(cache: &'static str, criteria: &CacheCriteria) -> CacheResult<i64> {
    criteria
        .as_id()
        .ok_or_else(|| CacheError::invalid_criteria(cache, CriteriaKind::Id, criteria.kind()))
}

fn expect_hostname<'a>(cache: &'static str, criteria: &'a CacheCriteria) -> CacheResult<&'a str> {
    criteria
        .as_hostname()
        .ok_or_else(|| CacheError::invalid_criteria(cache, CriteriaKind::Hostname, criteria.kind()))
}

// =============================================================================
// Endpoint cache
// =============================================================================

/// HTTP proxy endpoints keyed by endpoint id.
pub struct EndpointCache {
    base: BaseCache<i64, Arc<ProxyEndpoint>>,
    source: DynDataSource,
}

impl EndpointCache {
    pub const NAME: &'static str = "endpoint";

    pub fn new(source: DynDataSource, capacity: NonZeroUsize) -> Self {
        Self {
            base: BaseCache::new(Self::NAME, capacity),
            source,
        }
    }

    pub fn with_eviction_callback(
        source: DynDataSource,
        capacity: NonZeroUsize,
        on_evict: EvictionCallback<i64, Arc<ProxyEndpoint>>,
    ) -> Self {
        Self {
            base: BaseCache::with_eviction_callback(Self::NAME, capacity, on_evict),
            source,
        }
    }
}

impl DataSourceCache for EndpointCache {
    type Value = Arc<ProxyEndpoint>;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn lookup(&self, criteria: &CacheCriteria) -> CacheResult<Lookup<Self::Value>> {
        let id = expect_id(Self::NAME, criteria)?;
        self.base.get_or_load(id, |id| {
            self.source
                .find_proxy_endpoint_for_proxy(*id, ProxyEndpointType::Http)
                .map(Arc::new)
        })
    }

    fn cached(&self, criteria: &CacheCriteria) -> Option<Self::Value> {
        criteria.as_id().and_then(|id| self.base.peek(&id))
    }

    fn remove(&self, criteria: &CacheCriteria) -> bool {
        criteria.as_id().is_some_and(|id| self.base.remove(&id))
    }

    fn contains(&self, criteria: &CacheCriteria) -> bool {
        criteria.as_id().is_some_and(|id| self.base.contains(&id))
    }

    fn purge(&self) {
        self.base.purge();
    }

    fn len(&self) -> usize {
        self.base.len()
    }

    fn stats(&self) -> CacheStats {
        self.base.stats()
    }
}

// =============================================================================
// Library cache
// =============================================================================

/// Every library of an API, keyed by api id.
pub struct LibraryCache {
    base: BaseCache<i64, Arc<Vec<Library>>>,
    source: DynDataSource,
}

impl LibraryCache {
    pub const NAME: &'static str = "library";

    pub fn new(source: DynDataSource, capacity: NonZeroUsize) -> Self {
        Self {
            base: BaseCache::new(Self::NAME, capacity),
            source,
        }
    }
}

impl DataSourceCache for LibraryCache {
    type Value = Arc<Vec<Library>>;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn lookup(&self, criteria: &CacheCriteria) -> CacheResult<Lookup<Self::Value>> {
        let api_id = expect_id(Self::NAME, criteria)?;
        self.base
            .get_or_load(api_id, |api_id| self.source.all_libraries_for_api(*api_id).map(Arc::new))
    }

    fn cached(&self, criteria: &CacheCriteria) -> Option<Self::Value> {
        criteria.as_id().and_then(|id| self.base.peek(&id))
    }

    fn remove(&self, criteria: &CacheCriteria) -> bool {
        criteria.as_id().is_some_and(|id| self.base.remove(&id))
    }

    fn contains(&self, criteria: &CacheCriteria) -> bool {
        criteria.as_id().is_some_and(|id| self.base.contains(&id))
    }

    fn purge(&self) {
        self.base.purge();
    }

    fn len(&self) -> usize {
        self.base.len()
    }

    fn stats(&self) -> CacheStats {
        self.base.stats()
    }
}

// =============================================================================
// Plan cache
// =============================================================================

/// An account's plan, keyed by account id.
pub struct PlanCache {
    base: BaseCache<i64, Arc<Plan>>,
    source: DynDataSource,
}

impl PlanCache {
    pub const NAME: &'static str = "plan";

    pub fn new(source: DynDataSource, capacity: NonZeroUsize) -> Self {
        Self {
            base: BaseCache::new(Self::NAME, capacity),
            source,
        }
    }

    pub fn with_eviction_callback(
        source: DynDataSource,
        capacity: NonZeroUsize,
        on_evict: EvictionCallback<i64, Arc<Plan>>,
    ) -> Self {
        Self {
            base: BaseCache::with_eviction_callback(Self::NAME, capacity, on_evict),
            source,
        }
    }
}

impl DataSourceCache for PlanCache {
    type Value = Arc<Plan>;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn lookup(&self, criteria: &CacheCriteria) -> CacheResult<Lookup<Self::Value>> {
        let account_id = expect_id(Self::NAME, criteria)?;
        self.base.get_or_load(account_id, |account_id| {
            self.source.find_plan_by_account_id(*account_id).map(Arc::new)
        })
    }

    fn cached(&self, criteria: &CacheCriteria) -> Option<Self::Value> {
        criteria.as_id().and_then(|id| self.base.peek(&id))
    }

    fn remove(&self, criteria: &CacheCriteria) -> bool {
        criteria.as_id().is_some_and(|id| self.base.remove(&id))
    }

    fn contains(&self, criteria: &CacheCriteria) -> bool {
        criteria.as_id().is_some_and(|id| self.base.contains(&id))
    }

    fn purge(&self) {
        self.base.purge();
    }

    fn len(&self) -> usize {
        self.base.len()
    }

    fn stats(&self) -> CacheStats {
        self.base.stats()
    }
}

// =============================================================================
// Host cache
// =============================================================================

/// Hosts keyed by hostname.
pub struct HostCache {
    base: BaseCache<String, Arc<Host>>,
    source: DynDataSource,
}

impl HostCache {
    pub const NAME: &'static str = "host";

    pub fn new(source: DynDataSource, capacity: NonZeroUsize) -> Self {
        Self {
            base: BaseCache::new(Self::NAME, capacity),
            source,
        }
    }

    pub fn with_eviction_callback(
        source: DynDataSource,
        capacity: NonZeroUsize,
        on_evict: EvictionCallback<String, Arc<Host>>,
    ) -> Self {
        Self {
            base: BaseCache::with_eviction_callback(Self::NAME, capacity, on_evict),
            source,
        }
    }
}

impl DataSourceCache for HostCache {
    type Value = Arc<Host>;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn lookup(&self, criteria: &CacheCriteria) -> CacheResult<Lookup<Self::Value>> {
        let hostname = expect_hostname(Self::NAME, criteria)?;
        self.base.get_or_load(hostname.to_string(), |hostname| {
            self.source.find_host_for_hostname(hostname).map(Arc::new)
        })
    }

    fn cached(&self, criteria: &CacheCriteria) -> Option<Self::Value> {
        criteria.as_hostname().and_then(|hostname| self.base.peek(hostname))
    }

    fn remove(&self, criteria: &CacheCriteria) -> bool {
        criteria.as_hostname().is_some_and(|hostname| self.base.remove(hostname))
    }

    fn contains(&self, criteria: &CacheCriteria) -> bool {
        criteria.as_hostname().is_some_and(|hostname| self.base.contains(hostname))
    }

    fn purge(&self) {
        self.base.purge();
    }

    fn len(&self) -> usize {
        self.base.len()
    }

    fn stats(&self) -> CacheStats {
        self.base.stats()
    }
}
