//! # tollgate-gateway
//!
//! Process-level wiring for the Tollgate cache layer: configuration loading,
//! tracing setup and [`GatewayCaches`], which assembles caches, certificate
//! resolution, redirects and the notification registry from a
//! [`GatewayConfig`].

pub mod bootstrap;
pub mod config;
pub mod observability;

pub use bootstrap::{BootstrapError, GatewayCaches};
pub use config::{ConfigError, GatewayConfig};
