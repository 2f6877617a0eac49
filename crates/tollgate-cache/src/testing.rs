//! In-memory data source for unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tollgate_core::{
    Host, Library, ModelDataSource, Plan, ProxyEndpoint, ProxyEndpointType, SourceError, SourceResult,
};

/// Answers every lookup. Endpoints and hosts belong to api 1 and every account
/// is on plan 1 unless reassigned. Counts each call.
#[derive(Default)]
pub(crate) struct MockDataSource {
    loads: AtomicUsize,
    failing: AtomicBool,
    endpoint_apis: Mutex<HashMap<i64, i64>>,
    account_plans: Mutex<HashMap<i64, i64>>,
}

impl MockDataSource {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn assign_endpoint(&self, endpoint_id: i64, api_id: i64) {
        self.endpoint_apis.lock().insert(endpoint_id, api_id);
    }

    pub(crate) fn assign_plan(&self, account_id: i64, plan_id: i64) {
        self.account_plans.lock().insert(account_id, plan_id);
    }

    fn begin(&self) -> SourceResult<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::connection("data source unavailable"));
        }
        Ok(())
    }
}

impl ModelDataSource for MockDataSource {
    fn find_proxy_endpoint_for_proxy(
        &self,
        id: i64,
        endpoint_type: ProxyEndpointType,
    ) -> SourceResult<ProxyEndpoint> {
        self.begin()?;
        Ok(ProxyEndpoint {
            id,
            api_id: self.endpoint_apis.lock().get(&id).copied().unwrap_or(1),
            environment_id: 1,
            name: format!("endpoint-{id}"),
            endpoint_type,
            active: true,
        })
    }

    fn all_libraries_for_api(&self, api_id: i64) -> SourceResult<Vec<Library>> {
        self.begin()?;
        Ok((1..=3)
            .map(|id| Library {
                id,
                api_id,
                name: format!("library-{id}"),
                code: String::new(),
            })
            .collect())
    }

    fn find_plan_by_account_id(&self, account_id: i64) -> SourceResult<Plan> {
        self.begin()?;
        let id = self.account_plans.lock().get(&account_id).copied().unwrap_or(1);
        Ok(Plan {
            id,
            name: format!("plan-{id}"),
            ..Default::default()
        })
    }

    fn find_host_for_hostname(&self, hostname: &str) -> SourceResult<Host> {
        self.begin()?;
        Ok(Host {
            id: 1,
            api_id: 1,
            name: hostname.to_string(),
            hostname: hostname.to_string(),
            ..Default::default()
        })
    }
}
