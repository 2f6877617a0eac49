//! [`Caches`] without caching, for deployments with caching disabled.

use std::sync::Arc;

use tollgate_core::{DynDataSource, Host, Library, Plan, ProxyEndpoint, ProxyEndpointType};

use crate::caches::Caches;
use crate::criteria::{CacheCriteria, CriteriaKind};
use crate::error::{CacheError, CacheResult};
use crate::specialized::{EndpointCache, HostCache, LibraryCache, PlanCache};

/// Forwards every lookup to the data source. Criteria are checked exactly as
/// the caching implementation checks them.
pub struct PassThroughCaches {
    source: DynDataSource,
}

impl PassThroughCaches {
    pub fn new(source: DynDataSource) -> Self {
        Self { source }
    }

    pub fn new_shared(source: DynDataSource) -> Arc<Self> {
        Arc::new(Self::new(source))
    }
}

fn id(cache: &'static str, criteria: &CacheCriteria) -> CacheResult<i64> {
    criteria
        .as_id()
        .ok_or_else(|| CacheError::invalid_criteria(cache, CriteriaKind::Id, criteria.kind()))
}

impl Caches for PassThroughCaches {
    fn endpoint(&self, criteria: &CacheCriteria) -> CacheResult<Arc<ProxyEndpoint>> {
        let id = id(EndpointCache::NAME, criteria)?;
        Ok(Arc::new(
            self.source.find_proxy_endpoint_for_proxy(id, ProxyEndpointType::Http)?,
        ))
    }

    fn libraries(&self, criteria: &CacheCriteria) -> CacheResult<Arc<Vec<Library>>> {
        let api_id = id(LibraryCache::NAME, criteria)?;
        Ok(Arc::new(self.source.all_libraries_for_api(api_id)?))
    }

    fn plan(&self, criteria: &CacheCriteria) -> CacheResult<Arc<Plan>> {
        let account_id = id(PlanCache::NAME, criteria)?;
        Ok(Arc::new(self.source.find_plan_by_account_id(account_id)?))
    }

    fn host(&self, criteria: &CacheCriteria) -> CacheResult<Arc<Host>> {
        let hostname = criteria.as_hostname().ok_or_else(|| {
            CacheError::invalid_criteria(HostCache::NAME, CriteriaKind::Hostname, criteria.kind())
        })?;
        Ok(Arc::new(self.source.find_host_for_hostname(hostname)?))
    }
}

impl std::fmt::Debug for PassThroughCaches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassThroughCaches").finish_non_exhaustive()
    }
}
