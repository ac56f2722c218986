//! Redis-backed dispatcher for out-of-process mailers.
//!
//! Events are appended as JSON to a capped Redis stream per category and
//! published on a matching pub/sub channel. A separate consumer renders and
//! sends the mail.

use crate::bus::{DispatchError, DispatchResult, NotificationDispatcher};
use crate::types::Event;
use async_trait::async_trait;
use redis::aio::ConnectionManager;

/// Redis dispatcher configuration.
#[derive(Debug, Clone)]
pub struct RedisDispatcherConfig {
    /// Redis connection URL (e.g., redis://localhost:6379).
    pub url: String,

    /// Prefix for all Redis keys (default: "tenancy_events").
    pub key_prefix: String,

    /// Maximum stream length (MAXLEN, default: 10000).
    pub stream_max_len: usize,

    /// Also publish on pub/sub for live listeners (default: true).
    pub publish_live: bool,
}

impl Default for RedisDispatcherConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "tenancy_events".to_string(),
            stream_max_len: 10000,
            publish_live: true,
        }
    }
}

impl RedisDispatcherConfig {
    /// Load from environment.
    ///
    /// Reads `TENANCY_REDIS_URL` (falling back to `REDIS_URL`),
    /// `TENANCY_EVENTS_PREFIX` and `TENANCY_EVENTS_MAXLEN`. Unset or
    /// unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("TENANCY_REDIS_URL")
                .or_else(|_| std::env::var("REDIS_URL"))
                .unwrap_or(defaults.url),
            key_prefix: std::env::var("TENANCY_EVENTS_PREFIX").unwrap_or(defaults.key_prefix),
            stream_max_len: std::env::var("TENANCY_EVENTS_MAXLEN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.stream_max_len),
            publish_live: defaults.publish_live,
        }
    }

    /// Stream key for an event.
    pub fn stream_key(&self, event: &Event) -> String {
        format!("{}:stream:{}", self.key_prefix, event.category.as_str())
    }

    /// Pub/sub channel for an event.
    pub fn channel_key(&self, event: &Event) -> String {
        format!("{}:pubsub:{}", self.key_prefix, event.topic().replace('.', ":"))
    }
}

/// Dispatcher appending events to Redis streams.
///
/// # Example
///
/// ```rust,no_run
/// use tenancy_events::{NotificationDispatcher, Notification, RedisDispatcher, RedisDispatcherConfig};
///
/// async fn example() -> Result<(), Box<dyn std::error::Error>> {
///     let dispatcher = RedisDispatcher::new(RedisDispatcherConfig::from_env()).await?;
///     let event = Notification::PasswordChanged { user_id: 1, email: "a@example.com".into() };
///     dispatcher.dispatch(event.to_event()).await?;
///     Ok(())
/// }
/// ```
pub struct RedisDispatcher {
    conn: ConnectionManager,
    config: RedisDispatcherConfig,
}

impl std::fmt::Debug for RedisDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisDispatcher")
            .field("key_prefix", &self.config.key_prefix)
            .field("stream_max_len", &self.config.stream_max_len)
            .finish()
    }
}

impl RedisDispatcher {
    /// Connect to Redis.
    pub async fn new(config: RedisDispatcherConfig) -> DispatchResult<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| DispatchError::ConnectionError(e.to_string()))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| DispatchError::ConnectionError(e.to_string()))?;

        tracing::info!(prefix = %config.key_prefix, "Redis dispatcher connected");

        Ok(Self { conn, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &RedisDispatcherConfig {
        &self.config
    }
}

#[async_trait]
impl NotificationDispatcher for RedisDispatcher {
    async fn dispatch(&self, event: Event) -> DispatchResult<()> {
        let event_json = serde_json::to_string(&event)
            .map_err(|e| DispatchError::SerializationError(e.to_string()))?;
        let topic = event.topic();
        let mut conn = self.conn.clone();

        let _: String = redis::cmd("XADD")
            .arg(self.config.stream_key(&event))
            .arg("MAXLEN")
            .arg("~")
            .arg(self.config.stream_max_len)
            .arg("*")
            .arg("event")
            .arg(&event_json)
            .arg("topic")
            .arg(&topic)
            .arg("timestamp")
            .arg(event.timestamp.to_rfc3339())
            .query_async(&mut conn)
            .await
            .map_err(|e| DispatchError::PublishError(e.to_string()))?;

        if self.config.publish_live {
            let _: i64 = redis::cmd("PUBLISH")
                .arg(self.config.channel_key(&event))
                .arg(&event_json)
                .query_async(&mut conn)
                .await
                .map_err(|e| DispatchError::PublishError(e.to_string()))?;
        }

        tracing::debug!(topic = %topic, event_id = %event.id, "Event appended to Redis stream");

        Ok(())
    }
}
