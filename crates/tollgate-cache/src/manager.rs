//! The gateway's standard cache set.
//!
//! [`StandardCaches`] owns one cache per model type and the secondary indexes
//! that map a notification's coarse id (plan, api) onto the cache keys it
//! invalidates. Each cache and each index has its own lock and no code path
//! holds a cache lock and an index lock at the same time.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tollgate_core::{DynDataSource, Host, Library, Listener, Notification, Plan, ProxyEndpoint};
use tracing::{debug, info, trace};

use crate::caches::Caches;
use crate::criteria::CacheCriteria;
use crate::error::CacheResult;
use crate::index::SecondaryIndex;
use crate::rules::{Invalidation, RuleTable};
use crate::specialized::{DataSourceCache, EndpointCache, HostCache, LibraryCache, Lookup, PlanCache};
use crate::stats::CacheStats;

/// Read-through caches with notification-driven invalidation.
pub struct StandardCaches {
    endpoints: EndpointCache,
    libraries: LibraryCache,
    plans: PlanCache,
    hosts: HostCache,

    /// plan id → account ids with a cached plan
    plan_account_ids: SecondaryIndex<i64, i64>,
    /// api id → cached endpoint ids
    api_endpoint_ids: SecondaryIndex<i64, i64>,
    /// api id → cached hostnames
    api_hostnames: SecondaryIndex<i64, String>,

    rules: RuleTable,
}

impl StandardCaches {
    /// Build the cache set. Every cache holds at most `capacity` entries.
    pub fn new(source: DynDataSource, capacity: NonZeroUsize) -> Self {
        let plan_account_ids = SecondaryIndex::new("plan_account_ids");
        let api_endpoint_ids = SecondaryIndex::new("api_endpoint_ids");
        let api_hostnames = SecondaryIndex::new("api_hostnames");

        let sink = api_endpoint_ids.eviction_sink();
        let endpoints = EndpointCache::with_eviction_callback(
            Arc::clone(&source),
            capacity,
            Box::new(move |id: &i64, endpoint: &Arc<ProxyEndpoint>| sink.record(endpoint.api_id, *id)),
        );

        let sink = plan_account_ids.eviction_sink();
        let plans = PlanCache::with_eviction_callback(
            Arc::clone(&source),
            capacity,
            Box::new(move |account_id: &i64, plan: &Arc<Plan>| sink.record(plan.id, *account_id)),
        );

        let sink = api_hostnames.eviction_sink();
        let hosts = HostCache::with_eviction_callback(
            Arc::clone(&source),
            capacity,
            Box::new(move |hostname: &String, host: &Arc<Host>| sink.record(host.api_id, hostname.clone())),
        );

        Self {
            endpoints,
            libraries: LibraryCache::new(source, capacity),
            plans,
            hosts,
            plan_account_ids,
            api_endpoint_ids,
            api_hostnames,
            rules: RuleTable::standard(),
        }
    }

    pub fn new_shared(source: DynDataSource, capacity: NonZeroUsize) -> Arc<Self> {
        Arc::new(Self::new(source, capacity))
    }

    /// Replace the invalidation rules.
    #[must_use]
    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn endpoint_cache(&self) -> &EndpointCache {
        &self.endpoints
    }

    pub fn library_cache(&self) -> &LibraryCache {
        &self.libraries
    }

    pub fn plan_cache(&self) -> &PlanCache {
        &self.plans
    }

    pub fn host_cache(&self) -> &HostCache {
        &self.hosts
    }

    /// Accounts whose cached plan is `plan_id`.
    pub fn plan_account_ids(&self, plan_id: i64) -> Vec<i64> {
        self.plan_account_ids.keys(&plan_id)
    }

    /// Cached endpoint ids belonging to `api_id`.
    pub fn api_endpoint_ids(&self, api_id: i64) -> Vec<i64> {
        self.api_endpoint_ids.keys(&api_id)
    }

    /// Cached hostnames belonging to `api_id`.
    pub fn api_hostnames(&self, api_id: i64) -> Vec<String> {
        self.api_hostnames.keys(&api_id)
    }

    pub fn plan_account_index(&self) -> &SecondaryIndex<i64, i64> {
        &self.plan_account_ids
    }

    pub fn api_endpoint_index(&self) -> &SecondaryIndex<i64, i64> {
        &self.api_endpoint_ids
    }

    pub fn api_hostname_index(&self) -> &SecondaryIndex<i64, String> {
        &self.api_hostnames
    }

    /// Counters for every cache, by cache name.
    pub fn stats(&self) -> Vec<(&'static str, CacheStats)> {
        vec![
            (self.endpoints.name(), self.endpoints.stats()),
            (self.libraries.name(), self.libraries.stats()),
            (self.plans.name(), self.plans.stats()),
            (self.hosts.name(), self.hosts.stats()),
        ]
    }

    fn invalidate_account(&self, account_id: i64) {
        let criteria = CacheCriteria::Id(account_id);
        if let Some(plan) = self.plans.cached(&criteria) {
            self.plan_account_ids.detach(&plan.id, &account_id);
        }
        let removed = self.plans.remove(&criteria);
        debug!(account_id, removed, "Invalidated account plan");
    }

    fn invalidate_plan(&self, plan_id: i64) {
        let accounts = self.plan_account_ids.take(&plan_id);
        for account_id in &accounts {
            self.plans.remove(&CacheCriteria::Id(*account_id));
        }
        debug!(plan_id, accounts = accounts.len(), "Invalidated plan");
    }

    fn invalidate_api(&self, api_id: i64) {
        self.libraries.remove(&CacheCriteria::Id(api_id));

        let endpoint_ids = self.api_endpoint_ids.take(&api_id);
        for id in &endpoint_ids {
            self.endpoints.remove(&CacheCriteria::Id(*id));
        }

        let hostnames = self.api_hostnames.take(&api_id);
        for hostname in &hostnames {
            self.hosts.remove(&CacheCriteria::Hostname(hostname.clone()));
        }

        debug!(
            api_id,
            endpoints = endpoint_ids.len(),
            hosts = hostnames.len(),
            "Invalidated api"
        );
    }
}

impl Caches for StandardCaches {
    fn endpoint(&self, criteria: &CacheCriteria) -> CacheResult<Arc<ProxyEndpoint>> {
        let lookup = self.endpoints.lookup(criteria)?;
        if let (Lookup::Loaded(endpoint), Some(id)) = (&lookup, criteria.as_id()) {
            self.api_endpoint_ids.insert(endpoint.api_id, id);
        }
        Ok(lookup.into_value())
    }

    fn libraries(&self, criteria: &CacheCriteria) -> CacheResult<Arc<Vec<Library>>> {
        self.libraries.get(criteria)
    }

    fn plan(&self, criteria: &CacheCriteria) -> CacheResult<Arc<Plan>> {
        let lookup = self.plans.lookup(criteria)?;
        if let (Lookup::Loaded(plan), Some(account_id)) = (&lookup, criteria.as_id()) {
            self.plan_account_ids.insert(plan.id, account_id);
        }
        Ok(lookup.into_value())
    }

    fn host(&self, criteria: &CacheCriteria) -> CacheResult<Arc<Host>> {
        let lookup = self.hosts.lookup(criteria)?;
        if let (Lookup::Loaded(host), Some(hostname)) = (&lookup, criteria.as_hostname()) {
            self.api_hostnames.insert(host.api_id, hostname.to_string());
        }
        Ok(lookup.into_value())
    }
}

impl Listener for StandardCaches {
    fn name(&self) -> &str {
        "standard_caches"
    }

    fn notify(&self, notification: &Notification) {
        match self.rules.resolve(notification) {
            Some(Invalidation::Account) => self.invalidate_account(notification.account_id),
            Some(Invalidation::Plan) => self.invalidate_plan(notification.entity_id),
            Some(Invalidation::Api) => self.invalidate_api(notification.api_id),
            None => trace!(
                table = %notification.table,
                event = %notification.event,
                "Notification does not affect cached configuration"
            ),
        }
    }

    fn reconnect(&self) {
        // Indexes first: an entry loaded in between is then at worst tracked
        // without being resident, never resident without being tracked.
        self.plan_account_ids.clear();
        self.api_endpoint_ids.clear();
        self.api_hostnames.clear();

        self.endpoints.purge();
        self.libraries.purge();
        self.plans.purge();
        self.hosts.purge();

        info!("Purged all configuration caches after notification feed reconnect");
    }
}

impl std::fmt::Debug for StandardCaches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardCaches")
            .field("endpoints", &self.endpoints.len())
            .field("libraries", &self.libraries.len())
            .field("plans", &self.plans.len())
            .field("hosts", &self.hosts.len())
            .finish()
    }
}
