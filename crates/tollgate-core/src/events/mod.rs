//! Change notifications from the system of record.
//!
//! # Architecture
//!
//! ```text
//!   committed write ──► NotificationBroadcaster (tokio broadcast)
//!                                   │
//!                                   ▼
//!                      ListenerRegistry dispatcher task
//!                        │                       │
//!                        ▼                       ▼
//!               StandardCaches           CertificateCache
//!             (Listener::notify)        (Listener::notify)
//! ```
//!
//! Producers call `notify` exactly once per committed write, after commit, and
//! `reconnect` whenever the feed was re-established after a gap. A dispatcher
//! that lags behind the broadcast buffer has lost events and reports a
//! reconnect on its own.
//!
//! # Module Structure
//!
//! - [`types`]: [`Notification`] and [`NotificationEvent`]
//! - [`broadcaster`]: the in-process feed
//! - [`registry`]: the [`Listener`] contract and fan-out

pub mod broadcaster;
pub mod registry;
pub mod types;

pub use broadcaster::{FeedEvent, NotificationBroadcaster};
pub use registry::{Listener, ListenerRegistry};
pub use types::{Notification, NotificationEvent};
