//! Email verification state
//!
//! Every user has exactly one verification row. It is reset (unverified,
//! new token) when the user is created and whenever their email changes.

use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// Verification identifier (primary key).
pub type VerificationId = i64;

/// Tracks whether a user's current email address has been confirmed.
///
/// # Examples
///
/// ```
/// use tenancy_org::EmailVerification;
///
/// let mut verification = EmailVerification::new(1, 42);
/// assert!(!verification.verified);
///
/// let old_token = verification.token.clone();
/// verification.reset();
/// assert_ne!(verification.token, old_token);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailVerification {
    /// Unique verification ID
    pub id: VerificationId,

    /// Owning user (unique)
    pub user_id: UserId,

    /// Address in use before the last change
    pub previous_email: Option<String>,

    /// Whether the current address has been confirmed
    pub verified: bool,

    /// Secret token sent to the current address
    #[serde(skip_serializing, default)]
    pub token: String,
}

impl EmailVerification {
    /// Creates an unverified row with a fresh token.
    pub fn new(id: VerificationId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            previous_email: None,
            verified: false,
            token: tenancy_auth::token::generate(),
        }
    }

    /// Mark unverified and assign a freshly generated token.
    pub fn reset(&mut self) {
        self.verified = false;
        self.token = tenancy_auth::token::generate();
    }

    /// Reset after an email change, remembering the old address.
    pub fn reset_for_change(&mut self, previous_email: impl Into<String>) {
        self.previous_email = Some(previous_email.into()).filter(|e: &String| !e.is_empty());
        self.reset();
    }

    /// Check a presented (already normalized) token against this row.
    ///
    /// An empty token never matches.
    pub fn matches_token(&self, token: &str) -> bool {
        !token.is_empty() && self.token == token
    }

    /// Normalize a token as presented by a user.
    ///
    /// Verification tokens are compared case-insensitively.
    pub fn normalize_token(token: &str) -> String {
        token.trim().to_lowercase()
    }
}
