//! # tollgate-core
//!
//! Shared vocabulary for the Tollgate cache layer:
//!
//! - [`model`]: the configuration records the gateway resolves on every request
//! - [`source`]: the [`ModelDataSource`] contract consulted on a cache miss
//! - [`events`]: change notifications emitted by the system of record and the
//!   listener registry that fans them out to caches

pub mod error;
pub mod events;
pub mod model;
pub mod source;

pub use error::{SourceError, SourceResult};
pub use events::{
    FeedEvent, Listener, ListenerRegistry, Notification, NotificationBroadcaster,
    NotificationEvent,
};
pub use model::{Host, Library, Plan, ProxyEndpoint, ProxyEndpointType};
pub use source::{DynDataSource, ModelDataSource};
