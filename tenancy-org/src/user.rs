//! User identity as seen by the tenancy core
//!
//! Users are owned by the identity store. The core only reads them and
//! compares them; mutations go through the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User identifier (primary key).
pub type UserId = i64;

/// An account known to the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID
    pub id: UserId,

    /// Unique login name
    pub username: String,

    /// Email address (unique when non-empty)
    pub email: String,

    /// Given name
    #[serde(default)]
    pub first_name: String,

    /// Family name
    #[serde(default)]
    pub last_name: String,

    /// PHC-formatted password hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Inactive users cannot request password resets
    pub is_active: bool,

    /// Superusers may act in any organization
    pub is_superuser: bool,

    /// When the account was created
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Creates an active, non-superuser account with no password set.
    pub fn new(id: UserId, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            is_active: true,
            is_superuser: false,
            date_joined: Utc::now(),
        }
    }

    /// Grant or revoke superuser rights.
    pub fn with_superuser(mut self, is_superuser: bool) -> Self {
        self.is_superuser = is_superuser;
        self
    }

    /// Full display name, falling back to the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// The identity a request acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// No credentials were presented
    Anonymous,
    /// A user authenticated by the surrounding framework
    Authenticated(User),
}

impl Caller {
    /// The authenticated user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            Caller::Anonymous => None,
            Caller::Authenticated(user) => Some(user),
        }
    }

    /// Check if no user is attached.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Caller::Anonymous)
    }
}

impl From<User> for Caller {
    fn from(user: User) -> Self {
        Caller::Authenticated(user)
    }
}

impl From<Option<User>> for Caller {
    fn from(user: Option<User>) -> Self {
        user.map(Caller::Authenticated).unwrap_or(Caller::Anonymous)
    }
}
