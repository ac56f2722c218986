//! # Tenancy Events
//!
//! This crate provides the outbound notification interface for the tenancy
//! workflows. Workflows build a [`Notification`], wrap it in an [`Event`]
//! envelope and hand it to a [`NotificationDispatcher`], which returns
//! without waiting for delivery. Rendering and sending mail is the job of
//! whoever consumes the events.
//!
//! ## Features
//!
//! - `memory` (default): in-process dispatcher with topic subscriptions
//! - `redis`: dispatcher appending events to capped Redis streams
//!
//! ## Notifications
//!
//! | Name | Topic |
//! |------|-------|
//! | `user_created` | `account.user_created` |
//! | `email_changed` | `account.email_changed` |
//! | `password_reset_requested` | `account.password_reset_requested` |
//! | `password_changed` | `account.password_changed` |
//! | `invite_existing_user` | `invite.invite_existing_user` |
//! | `invite_by_email` | `invite.invite_by_email` |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tenancy_events::{MemoryDispatcher, Notification, NotificationDispatcher};
//!
//! async fn example() {
//!     let dispatcher = MemoryDispatcher::new();
//!
//!     // Watch every invite notification
//!     let mut invites = dispatcher.subscribe("invite.*").await;
//!
//!     let notification = Notification::InviteByEmail {
//!         invite_id: 1,
//!         organization_id: 7,
//!         inviter_id: 3,
//!         email: "test@example.com".into(),
//!         token: "d6c1...".into(),
//!     };
//!     dispatcher.dispatch(notification.to_event()).await.unwrap();
//!
//!     while let Ok(event) = invites.recv().await {
//!         println!("Received: {}", event.topic());
//!     }
//! }
//! ```
//!
//! ## Topic Patterns
//!
//! Topics are structured as `{category}.{name}`:
//! - `*` matches exactly one segment
//! - `#` matches zero or more segments

pub mod bus;
pub mod types;

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

// Re-export main types
pub use bus::{
    topic_matches, DispatchError, DispatchResult, NotificationDispatcher, NotificationHandler,
};
pub use types::{Event, EventCategory, Notification};

#[cfg(feature = "memory")]
pub use memory::{DispatchStats, MemoryDispatcher, Subscription};

#[cfg(feature = "redis")]
pub use self::redis::{RedisDispatcher, RedisDispatcherConfig};
