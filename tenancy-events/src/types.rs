//! Notification types
//!
//! This module defines the notifications the tenancy workflows emit and
//! the envelope they travel in. Delivery (mail rendering, sending,
//! retries) belongs to whoever consumes the envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification envelope.
///
/// All notifications are wrapped in this envelope, which carries what is
/// needed for routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Event name (e.g., "invite_by_email", "password_changed")
    pub name: String,

    /// Category used as the first topic segment
    pub category: EventCategory,

    /// Timestamp when event was created
    pub timestamp: DateTime<Utc>,

    /// Organization context
    pub organization_id: Option<i64>,

    /// User the notification is about
    pub user_id: Option<i64>,

    /// Event version for schema evolution
    pub version: u32,

    /// Event payload
    pub payload: serde_json::Value,
}

impl Event {
    /// Create a new event.
    ///
    /// # Arguments
    ///
    /// * `name` - The event name
    /// * `category` - The event category
    /// * `payload` - The event payload
    pub fn new(name: impl Into<String>, category: EventCategory, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            category,
            timestamp: Utc::now(),
            organization_id: None,
            user_id: None,
            version: 1,
            payload,
        }
    }

    /// Set organization context.
    pub fn with_organization(mut self, organization_id: i64) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    /// Set user context.
    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Get the topic for this event.
    ///
    /// Topics are structured as: `{category}.{name}`
    pub fn topic(&self) -> String {
        format!("{}.{}", self.category.as_str(), self.name)
    }

    /// Parse the payload back into a notification.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Event categories for filtering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Account lifecycle and credential events
    Account,
    /// Organization invitation events
    Invite,
}

impl EventCategory {
    /// Get string representation of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Account => "account",
            EventCategory::Invite => "invite",
        }
    }
}

/// Notifications emitted by the tenancy workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A user signed up
    UserCreated {
        user_id: i64,
        username: String,
        email: String,
    },
    /// A user changed their email address; the new one needs verifying
    EmailChanged {
        user_id: i64,
        previous_email: Option<String>,
        email: String,
        verification_token: String,
    },
    /// A password reset link should be mailed
    PasswordResetRequested {
        user_id: i64,
        email: String,
        token: String,
    },
    /// A password was changed through the reset flow
    PasswordChanged { user_id: i64, email: String },
    /// An existing user was invited to an organization
    InviteExistingUser {
        invite_id: i64,
        organization_id: i64,
        inviter_id: i64,
        user_id: i64,
        email: String,
        token: String,
    },
    /// An email address without an account was invited
    InviteByEmail {
        invite_id: i64,
        organization_id: i64,
        inviter_id: i64,
        email: String,
        token: String,
    },
}

impl Notification {
    /// Event name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Notification::UserCreated { .. } => "user_created",
            Notification::EmailChanged { .. } => "email_changed",
            Notification::PasswordResetRequested { .. } => "password_reset_requested",
            Notification::PasswordChanged { .. } => "password_changed",
            Notification::InviteExistingUser { .. } => "invite_existing_user",
            Notification::InviteByEmail { .. } => "invite_by_email",
        }
    }

    /// Category of this notification.
    pub fn category(&self) -> EventCategory {
        match self {
            Notification::InviteExistingUser { .. } | Notification::InviteByEmail { .. } => {
                EventCategory::Invite
            }
            _ => EventCategory::Account,
        }
    }

    /// Convert to a generic event.
    pub fn to_event(&self) -> Event {
        let payload = serde_json::to_value(self).unwrap_or_default();
        let event = Event::new(self.name(), self.category(), payload);

        match self {
            Notification::UserCreated { user_id, .. }
            | Notification::EmailChanged { user_id, .. }
            | Notification::PasswordResetRequested { user_id, .. }
            | Notification::PasswordChanged { user_id, .. } => event.with_user(*user_id),
            Notification::InviteExistingUser {
                organization_id,
                user_id,
                ..
            } => event.with_organization(*organization_id).with_user(*user_id),
            Notification::InviteByEmail {
                organization_id, ..
            } => event.with_organization(*organization_id),
        }
    }
}

impl From<Notification> for Event {
    fn from(notification: Notification) -> Self {
        notification.to_event()
    }
}
