//! Notification feed broadcaster.
//!
//! The write side publishes every committed change here. Each subscriber gets
//! its own bounded queue; a subscriber that falls behind loses the oldest
//! events and is told so via `RecvError::Lagged`.

use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::Notification;

/// Default buffer size for the broadcast channel.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// An item on the notification feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A committed write.
    Notification(Notification),
    /// The upstream connection was lost and re-established. Writes during the
    /// outage may not have produced notifications.
    Reconnected,
}

/// Broadcaster for change notifications.
///
/// Cheap to clone; all clones publish on the same channel.
#[derive(Clone)]
pub struct NotificationBroadcaster {
    sender: broadcast::Sender<FeedEvent>,
}

impl NotificationBroadcaster {
    /// Create a new broadcaster with default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new broadcaster with custom buffer size.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new broadcaster wrapped in an Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Publish a notification.
    ///
    /// Returns the number of subscribers that received it, 0 if there are none.
    pub fn publish(&self, notification: Notification) -> usize {
        self.sender
            .send(FeedEvent::Notification(notification))
            .unwrap_or_default()
    }

    /// Announce that the upstream feed was re-established after a gap.
    pub fn publish_reconnect(&self) -> usize {
        self.sender.send(FeedEvent::Reconnected).unwrap_or_default()
    }

    /// Subscribe to the feed. Events published before subscribing are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NotificationBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
