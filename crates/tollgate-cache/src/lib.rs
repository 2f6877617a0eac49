//! # tollgate-cache
//!
//! Bounded, read-through caches for gateway configuration, kept fresh by
//! change notifications instead of timeouts.
//!
//! ## Layers
//!
//! - [`store`]: the unsynchronized LRU table every cache is built on
//! - [`specialized`]: one read-through cache per model type
//! - [`index`]: secondary indexes that map a notification onto cache keys
//! - [`rules`]: which tables and events invalidate what
//! - [`manager`]: [`StandardCaches`], tying caches, indexes and rules together
//! - [`passthrough`]: [`PassThroughCaches`], for caching disabled
//!
//! ## Example
//!
//! ```ignore
//! let caches = StandardCaches::new_shared(source, NonZeroUsize::new(1024).unwrap());
//! registry.register(caches.clone());
//!
//! let plan = caches.plan(&CacheCriteria::Id(account_id))?;
//! ```

pub mod caches;
pub mod criteria;
pub mod error;
pub mod index;
pub mod manager;
pub mod passthrough;
pub mod rules;
pub mod specialized;
pub mod stats;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use caches::{Caches, DynCaches};
pub use criteria::{CacheCriteria, CriteriaKind};
pub use error::{CacheError, CacheResult};
pub use index::{EvictionSink, SecondaryIndex};
pub use manager::StandardCaches;
pub use passthrough::PassThroughCaches;
pub use rules::{EventMatch, Invalidation, InvalidationRule, RuleTable};
pub use specialized::{
    BaseCache, DataSourceCache, EndpointCache, HostCache, LibraryCache, Lookup, PlanCache,
};
pub use stats::CacheStats;
pub use store::{BoundedStore, EvictionCallback};
