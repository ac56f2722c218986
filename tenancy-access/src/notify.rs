//! Fire-and-forget notification helper.

use tenancy_events::{Notification, NotificationDispatcher};

/// Dispatch a notification, logging instead of failing on error.
pub(crate) async fn notify(dispatcher: &dyn NotificationDispatcher, notification: Notification) {
    let name = notification.name();
    match dispatcher.dispatch(notification.to_event()).await {
        Ok(()) => tracing::debug!(event = name, "Notification dispatched"),
        Err(e) => tracing::warn!(event = name, error = %e, "Notification dispatch failed"),
    }
}
