//! Listener registry and feed dispatcher.
//!
//! The registry holds every cache that must react to writes and fans each
//! notification (or reconnect) out to all of them in registration order.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::broadcaster::FeedEvent;
use super::types::Notification;

/// A consumer of change notifications.
///
/// Implementations are called synchronously from the delivering thread and
/// must not block for long.
pub trait Listener: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// React to a single committed write.
    fn notify(&self, notification: &Notification);

    /// The feed was lost and re-established; incremental state can no longer
    /// be trusted.
    fn reconnect(&self);
}

/// Registry of notification listeners.
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn Listener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a listener. It receives every event delivered afterwards.
    pub fn register(&self, listener: Arc<dyn Listener>) {
        debug!(listener = %listener.name(), "Registered notification listener");
        self.listeners.write().push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Deliver a notification to every listener.
    pub fn notify(&self, notification: &Notification) {
        for listener in self.snapshot() {
            listener.notify(notification);
        }
    }

    /// Tell every listener that the feed had a gap.
    pub fn reconnect(&self) {
        let listeners = self.snapshot();
        info!(listeners = listeners.len(), "Notification feed reconnected, resetting listeners");
        for listener in listeners {
            listener.reconnect();
        }
    }

    /// Spawn a task that forwards a broadcast feed to this registry.
    ///
    /// A lagged receiver has lost events, so it is handled exactly like an
    /// upstream reconnect. The task ends when the channel closes.
    pub fn spawn_dispatcher(
        self: &Arc<Self>,
        receiver: broadcast::Receiver<FeedEvent>,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(registry.run_dispatcher(receiver))
    }

    /// Run the dispatch loop on the current task.
    pub async fn run_dispatcher(self: Arc<Self>, mut receiver: broadcast::Receiver<FeedEvent>) {
        info!("Starting notification dispatcher");

        loop {
            match receiver.recv().await {
                Ok(FeedEvent::Notification(notification)) => {
                    debug!(
                        table = %notification.table,
                        event = %notification.event,
                        "Dispatching notification"
                    );
                    self.notify(&notification);
                }
                Ok(FeedEvent::Reconnected) => self.reconnect(),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Notification dispatcher lagged, treating as reconnect");
                    self.reconnect();
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Notification feed closed, stopping dispatcher");
                    break;
                }
            }
        }
    }

    // Listeners are called outside the registry lock.
    fn snapshot(&self) -> Vec<Arc<dyn Listener>> {
        self.listeners.read().clone()
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}
