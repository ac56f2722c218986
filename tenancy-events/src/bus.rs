//! Notification dispatch
//!
//! This module provides the outbound dispatcher abstraction the tenancy
//! workflows call, the handler interface for in-process consumers and the
//! topic pattern matching shared by dispatchers.

use crate::types::Event;
use async_trait::async_trait;
use thiserror::Error;

/// Dispatch error types.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Failed to hand the event to the transport
    #[error("Failed to dispatch event: {0}")]
    PublishError(String),

    /// Transport connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Handler rejected the event
    #[error("Handler error: {0}")]
    HandlerError(String),

    /// Channel closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Outbound notification interface.
///
/// `dispatch` hands the event to a transport and returns without waiting
/// for delivery. Callers treat failures as non-fatal.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Dispatch an event.
    async fn dispatch(&self, event: Event) -> DispatchResult<()>;
}

/// Handler invoked for events whose topic matches one of its patterns.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: Event) -> DispatchResult<()>;

    /// Topic patterns this handler is interested in.
    fn topics(&self) -> Vec<String>;
}

/// Check if a topic matches a pattern.
///
/// Topics are dot-separated. In patterns `*` matches exactly one segment
/// and `#` matches zero or more segments.
///
/// ```
/// use tenancy_events::topic_matches;
///
/// assert!(topic_matches("invite.*", "invite.invite_by_email"));
/// assert!(topic_matches("#", "account.password_changed"));
/// assert!(!topic_matches("account.*", "invite.invite_by_email"));
/// ```
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let topic: Vec<&str> = topic.split('.').collect();
    segments_match(&pattern, &topic)
}

fn segments_match(pattern: &[&str], topic: &[&str]) -> bool {
    match pattern.split_first() {
        None => topic.is_empty(),
        Some((&"#", rest)) => (0..=topic.len()).any(|skip| segments_match(rest, &topic[skip..])),
        Some((&segment, rest)) => match topic.split_first() {
            Some((&head, tail)) => (segment == "*" || segment == head) && segments_match(rest, tail),
            None => false,
        },
    }
}
