//! In-memory dispatcher
//!
//! Routes events to topic subscribers and registered handlers within the
//! process. Enabled by the `memory` feature.

use crate::bus::{
    topic_matches, DispatchError, DispatchResult, NotificationDispatcher, NotificationHandler,
};
use crate::types::Event;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Subscription handle for receiving events.
pub struct Subscription {
    /// Subscription ID
    pub id: String,
    /// Topic pattern
    pub pattern: String,
    receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receive the next event.
    pub async fn recv(&mut self) -> DispatchResult<Event> {
        self.receiver
            .recv()
            .await
            .map_err(|_| DispatchError::ChannelClosed)
    }

    /// Take the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Drain every buffered event.
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("pattern", &self.pattern)
            .finish()
    }
}

/// Dispatcher statistics.
#[derive(Debug, Clone, Default)]
pub struct DispatchStats {
    /// Total events dispatched
    pub events_dispatched: u64,
    /// Total deliveries to subscribers
    pub events_delivered: u64,
    /// Active subscriptions
    pub active_subscriptions: usize,
    /// Distinct patterns with a live channel
    pub active_patterns: usize,
    /// Registered handlers
    pub registered_handlers: usize,
}

/// In-memory dispatcher.
///
/// Suitable for single-process deployments and tests. Handlers run on
/// spawned tasks so `dispatch` never waits for them.
pub struct MemoryDispatcher {
    /// Subscribers keyed by topic pattern
    subscribers: Arc<RwLock<HashMap<String, broadcast::Sender<Event>>>>,
    /// Registered handlers
    handlers: Arc<RwLock<Vec<Arc<dyn NotificationHandler>>>>,
    /// Statistics
    stats: Arc<RwLock<DispatchStats>>,
    /// Channel capacity per pattern
    channel_capacity: usize,
}

impl std::fmt::Debug for MemoryDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDispatcher")
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

impl MemoryDispatcher {
    /// Create a new in-memory dispatcher.
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create with custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            handlers: Arc::new(RwLock::new(Vec::new())),
            stats: Arc::new(RwLock::new(DispatchStats::default())),
            channel_capacity: capacity,
        }
    }

    /// Subscribe to a topic pattern.
    ///
    /// Only events dispatched after this call are received.
    pub async fn subscribe(&self, pattern: &str) -> Subscription {
        let receiver = {
            let mut subscribers = self.subscribers.write().await;
            match subscribers.get(pattern) {
                Some(sender) => sender.subscribe(),
                None => {
                    let (sender, receiver) = broadcast::channel(self.channel_capacity);
                    subscribers.insert(pattern.to_string(), sender);
                    receiver
                }
            }
        };

        self.stats.write().await.active_subscriptions += 1;

        Subscription {
            id: uuid::Uuid::now_v7().to_string(),
            pattern: pattern.to_string(),
            receiver,
        }
    }

    /// Release a subscription.
    ///
    /// The pattern's channel is dropped once its last receiver is gone.
    pub async fn unsubscribe(&self, subscription: Subscription) {
        let pattern = subscription.pattern.clone();
        drop(subscription);

        {
            let mut subscribers = self.subscribers.write().await;
            if subscribers
                .get(&pattern)
                .is_some_and(|sender| sender.receiver_count() == 0)
            {
                subscribers.remove(&pattern);
            }
        }

        let mut stats = self.stats.write().await;
        stats.active_subscriptions = stats.active_subscriptions.saturating_sub(1);
    }

    /// Register a handler.
    pub async fn register_handler(&self, handler: Arc<dyn NotificationHandler>) {
        self.handlers.write().await.push(handler);
        self.stats.write().await.registered_handlers += 1;
    }

    /// Get dispatcher stats.
    pub async fn stats(&self) -> DispatchStats {
        let active_patterns = self.subscribers.read().await.len();
        DispatchStats {
            active_patterns,
            ..self.stats.read().await.clone()
        }
    }
}

impl Default for MemoryDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationDispatcher for MemoryDispatcher {
    async fn dispatch(&self, event: Event) -> DispatchResult<()> {
        let topic = event.topic();
        let mut delivered = 0u64;

        {
            let subscribers = self.subscribers.read().await;
            for (pattern, sender) in subscribers.iter() {
                if topic_matches(pattern, &topic) && sender.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }

        {
            let handlers = self.handlers.read().await;
            for handler in handlers.iter() {
                if handler.topics().iter().any(|p| topic_matches(p, &topic)) {
                    let handler = handler.clone();
                    let event = event.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handler.handle(event).await {
                            tracing::error!(error = %e, "Notification handler failed");
                        }
                    });
                }
            }
        }

        let mut stats = self.stats.write().await;
        stats.events_dispatched += 1;
        stats.events_delivered += delivered;

        tracing::debug!(topic = %topic, event_id = %event.id, delivered, "Event dispatched");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventCategory, Notification};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn password_changed() -> Event {
        Notification::PasswordChanged {
            user_id: 1,
            email: "john@example.com".into(),
        }
        .to_event()
    }

    #[tokio::test]
    async fn test_dispatch_reaches_matching_subscriber() {
        let dispatcher = MemoryDispatcher::new();
        let mut account = dispatcher.subscribe("account.*").await;
        let mut invites = dispatcher.subscribe("invite.*").await;

        dispatcher.dispatch(password_changed()).await.unwrap();

        let received = tokio::time::timeout(Duration::from_millis(100), account.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.name, "password_changed");
        assert!(invites.try_recv().is_none());
    }

    struct CountingHandler {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl NotificationHandler for CountingHandler {
        async fn handle(&self, _event: Event) -> DispatchResult<()> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn topics(&self) -> Vec<String> {
            vec!["account.#".into(), "#.password_changed".into()]
        }
    }

    #[tokio::test]
    async fn test_handler_runs_once_per_event() {
        let dispatcher = MemoryDispatcher::new();
        let seen = Arc::new(AtomicUsize::new(0));
        dispatcher
            .register_handler(Arc::new(CountingHandler { seen: seen.clone() }))
            .await;

        dispatcher.dispatch(password_changed()).await.unwrap();
        dispatcher
            .dispatch(Event::new("invite_by_email", EventCategory::Invite, serde_json::json!({})))
            .await
            .unwrap();

        for _ in 0..50 {
            if seen.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let dispatcher = MemoryDispatcher::new();

        let stats = dispatcher.stats().await;
        assert_eq!(stats.events_dispatched, 0);
        assert_eq!(stats.active_subscriptions, 0);

        let mut sub = dispatcher.subscribe("#").await;
        assert_eq!(dispatcher.stats().await.active_subscriptions, 1);

        dispatcher.dispatch(password_changed()).await.unwrap();
        assert_eq!(sub.drain().len(), 1);

        let stats = dispatcher.stats().await;
        assert_eq!(stats.events_dispatched, 1);
        assert_eq!(stats.events_delivered, 1);

        dispatcher.unsubscribe(sub).await;
        assert_eq!(dispatcher.stats().await.active_subscriptions, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_pattern_with_last_receiver() {
        let dispatcher = MemoryDispatcher::new();
        let first = dispatcher.subscribe("account.*").await;
        let mut second = dispatcher.subscribe("account.*").await;
        let other = dispatcher.subscribe("invite.*").await;
        assert_eq!(dispatcher.stats().await.active_patterns, 2);

        dispatcher.unsubscribe(first).await;
        assert_eq!(dispatcher.stats().await.active_patterns, 2);

        dispatcher.dispatch(password_changed()).await.unwrap();
        assert_eq!(second.drain().len(), 1);

        dispatcher.unsubscribe(second).await;
        dispatcher.unsubscribe(other).await;

        let stats = dispatcher.stats().await;
        assert_eq!(stats.active_patterns, 0);
        assert_eq!(stats.active_subscriptions, 0);

        // A released pattern can be subscribed again
        let mut again = dispatcher.subscribe("account.*").await;
        dispatcher.dispatch(password_changed()).await.unwrap();
        assert_eq!(again.drain().len(), 1);
    }
}
