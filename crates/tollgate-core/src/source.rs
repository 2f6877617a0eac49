//! Data-source contract consulted by the caches on a miss.

use std::sync::Arc;

use crate::error::SourceResult;
use crate::model::{Host, Library, Plan, ProxyEndpoint, ProxyEndpointType};

/// Loads configuration records from the system of record.
///
/// Calls are synchronous and may block on a network round trip. Timeouts and
/// cancellation are the implementation's responsibility; the caches impose none.
pub trait ModelDataSource: Send + Sync {
    /// Find an endpoint by id, restricted to the given endpoint type.
    fn find_proxy_endpoint_for_proxy(
        &self,
        id: i64,
        endpoint_type: ProxyEndpointType,
    ) -> SourceResult<ProxyEndpoint>;

    /// All libraries attached to an API.
    fn all_libraries_for_api(&self, api_id: i64) -> SourceResult<Vec<Library>>;

    /// The plan an account is subscribed to.
    fn find_plan_by_account_id(&self, account_id: i64) -> SourceResult<Plan>;

    /// The host record for a hostname.
    fn find_host_for_hostname(&self, hostname: &str) -> SourceResult<Host>;
}

/// Type alias for a shared data source.
pub type DynDataSource = Arc<dyn ModelDataSource>;
