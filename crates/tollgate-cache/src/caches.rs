//! The lookup surface the proxy consumes.

use std::sync::Arc;

use tollgate_core::{Host, Library, Plan, ProxyEndpoint};

use crate::criteria::CacheCriteria;
use crate::error::CacheResult;

/// Read access to gateway configuration.
///
/// Endpoints, libraries and plans take [`CacheCriteria::Id`] (endpoint id,
/// api id and account id respectively). Hosts take
/// [`CacheCriteria::Hostname`].
pub trait Caches: Send + Sync {
    fn endpoint(&self, criteria: &CacheCriteria) -> CacheResult<Arc<ProxyEndpoint>>;

    fn libraries(&self, criteria: &CacheCriteria) -> CacheResult<Arc<Vec<Library>>>;

    fn plan(&self, criteria: &CacheCriteria) -> CacheResult<Arc<Plan>>;

    fn host(&self, criteria: &CacheCriteria) -> CacheResult<Arc<Host>>;
}

pub type DynCaches = Arc<dyn Caches>;
