//! Invitation domain model
//!
//! An invite is a single-use, token-bearing offer to join an organization.
//! It is either bound to an existing user or addressed to a bare email.
//! Accepting or rejecting it consumes it; consumed invites are deleted
//! rather than kept in a terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::membership::Membership;
use crate::organization::OrganizationId;
use crate::roles::OrganizationRole;
use crate::user::UserId;

/// Invite identifier (primary key).
pub type InviteId = i64;

/// An invite that has not been persisted yet.
///
/// The token is generated when this value is built, so every freshly
/// created invite row gets its own token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvite {
    /// Organization the invite grants access to
    pub organization_id: OrganizationId,

    /// Existing user the invite is addressed to
    pub invited_user_id: Option<UserId>,

    /// User who created the invite
    pub inviter_id: UserId,

    /// Address for email invites (empty when bound to a user)
    pub email: String,

    /// Role granted on acceptance
    pub role: OrganizationRole,

    /// Acceptance meant to be restricted to the invited user
    pub strict: bool,

    /// Secret token for accepting or rejecting
    pub token: String,
}

impl NewInvite {
    /// Invite an existing user.
    pub fn for_user(
        organization_id: OrganizationId,
        inviter_id: UserId,
        user_id: UserId,
        role: OrganizationRole,
        strict: bool,
    ) -> Self {
        Self {
            organization_id,
            invited_user_id: Some(user_id),
            inviter_id,
            email: String::new(),
            role,
            strict,
            token: tenancy_auth::token::generate(),
        }
    }

    /// Invite a bare email address with no account behind it.
    pub fn for_email(
        organization_id: OrganizationId,
        inviter_id: UserId,
        email: impl Into<String>,
        role: OrganizationRole,
        strict: bool,
    ) -> Self {
        Self {
            organization_id,
            invited_user_id: None,
            inviter_id,
            email: email.into(),
            role,
            strict,
            token: tenancy_auth::token::generate(),
        }
    }

    /// Attach the id assigned by the store.
    pub fn into_invite(self, id: InviteId) -> Invite {
        Invite {
            id,
            organization_id: self.organization_id,
            invited_user_id: self.invited_user_id,
            inviter_id: self.inviter_id,
            email: self.email,
            role: self.role,
            strict: self.strict,
            token: self.token,
            created_at: Utc::now(),
        }
    }
}

/// A persisted invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    /// Unique invite ID
    pub id: InviteId,

    /// Organization the invite grants access to
    pub organization_id: OrganizationId,

    /// Existing user the invite is addressed to
    pub invited_user_id: Option<UserId>,

    /// User who created the invite
    pub inviter_id: UserId,

    /// Address for email invites (empty when bound to a user)
    pub email: String,

    /// Role granted on acceptance
    pub role: OrganizationRole,

    /// Acceptance meant to be restricted to the invited user
    pub strict: bool,

    /// Secret token for accepting or rejecting
    #[serde(skip_serializing, default)]
    pub token: String,

    /// When the invite was created
    pub created_at: DateTime<Utc>,
}

impl Invite {
    /// Check if the invite is addressed to an email rather than a user.
    pub fn is_email_invite(&self) -> bool {
        self.invited_user_id.is_none()
    }

    /// Check if the given user may consume this invite under strict rules.
    ///
    /// Non-strict invites and email invites accept anyone.
    pub fn strict_allows(&self, user_id: UserId) -> bool {
        !self.strict || self.invited_user_id.map_or(true, |bound| bound == user_id)
    }

    /// Check a presented token against this invite.
    ///
    /// An empty token never matches, even an invite carrying an empty token.
    pub fn matches_token(&self, token: &str) -> bool {
        !token.is_empty() && self.token == token
    }
}

/// What the holder of an invite token wants to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinAction {
    /// Join the organization
    Accept,
    /// Decline and discard the invite
    Reject,
}

impl JoinAction {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "accept" => Some(Self::Accept),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    /// Get string representation of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }
}

/// Result of atomically consuming an invite into a membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// Membership created, invite deleted
    Joined(Membership),
    /// User was already a member; invite and membership left untouched
    AlreadyMember(Membership),
    /// Invite no longer exists (consumed concurrently)
    Gone,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_invite() {
        let invite = NewInvite::for_user(1, 2, 3, OrganizationRole::MEMBER, false).into_invite(9);

        assert_eq!(invite.id, 9);
        assert_eq!(invite.invited_user_id, Some(3));
        assert!(invite.email.is_empty());
        assert!(!invite.is_email_invite());
        assert_eq!(invite.token.len(), 36);
    }

    #[test]
    fn test_email_invite() {
        let invite =
            NewInvite::for_email(1, 2, "test@example.com", OrganizationRole::MEMBER, false)
                .into_invite(1);

        assert!(invite.is_email_invite());
        assert_eq!(invite.email, "test@example.com");
    }

    #[test]
    fn test_fresh_token_per_invite() {
        let first = NewInvite::for_email(1, 2, "a@example.com", OrganizationRole::MEMBER, false);
        let second = NewInvite::for_email(1, 2, "a@example.com", OrganizationRole::MEMBER, false);
        assert_ne!(first.token, second.token);
    }

    #[test]
    fn test_empty_token_never_matches() {
        let mut invite =
            NewInvite::for_email(1, 2, "a@example.com", OrganizationRole::MEMBER, false)
                .into_invite(1);
        invite.token = String::new();

        assert!(!invite.matches_token(""));
    }

    #[test]
    fn test_matches_token() {
        let invite = NewInvite::for_user(1, 2, 3, OrganizationRole::MEMBER, false).into_invite(1);
        let token = invite.token.clone();

        assert!(invite.matches_token(&token));
        assert!(!invite.matches_token(&token.to_uppercase()));
    }

    #[test]
    fn test_strict_allows() {
        let loose = NewInvite::for_user(1, 2, 3, OrganizationRole::MEMBER, false).into_invite(1);
        assert!(loose.strict_allows(4));

        let strict = NewInvite::for_user(1, 2, 3, OrganizationRole::MEMBER, true).into_invite(2);
        assert!(strict.strict_allows(3));
        assert!(!strict.strict_allows(4));

        let strict_email =
            NewInvite::for_email(1, 2, "a@example.com", OrganizationRole::MEMBER, true)
                .into_invite(3);
        assert!(strict_email.strict_allows(4));
    }

    #[test]
    fn test_join_action_parse() {
        assert_eq!(JoinAction::parse("ACCEPT"), Some(JoinAction::Accept));
        assert_eq!(JoinAction::parse("reject"), Some(JoinAction::Reject));
        assert_eq!(JoinAction::parse("ignore"), None);
        assert_eq!(JoinAction::Reject.as_str(), "reject");
    }

    #[test]
    fn test_token_not_serialized() {
        let invite = NewInvite::for_user(1, 2, 3, OrganizationRole::MEMBER, false).into_invite(1);
        let json = serde_json::to_string(&invite).unwrap();
        assert!(!json.contains(&invite.token));
    }
}
