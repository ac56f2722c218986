//! Invitation workflow.
//!
//! Invites go `CREATED -> ACCEPTED | REJECTED`. Both terminal transitions
//! delete the row, and acceptance creates the membership in the same store
//! step, so an invite is consumed exactly once.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use tenancy_events::{Notification, NotificationDispatcher};
use tenancy_org::{
    AcceptOutcome, Invite, JoinAction, Membership, NewInvite, Organization, OrganizationRole, User,
};

use crate::authority::MembershipAuthority;
use crate::error::{AccessError, AccessResult};
use crate::notify::notify;
use crate::store::{IdentityStore, InviteStore, MembershipStore, OrganizationStore};

/// Input for creating an invite.
#[derive(Debug, Clone, Default)]
pub struct CreateInvite {
    /// Username or email of the invitee
    pub handle: Option<String>,
    /// Role granted on acceptance
    pub role: OrganizationRole,
    /// Flag binding acceptance to the invited user (stored only)
    pub strict: bool,
}

impl CreateInvite {
    /// Invite `handle` with the default member role.
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: Some(handle.into()),
            ..Default::default()
        }
    }

    /// Set the role granted on acceptance.
    pub fn with_role(mut self, role: OrganizationRole) -> Self {
        self.role = role;
        self
    }

    /// Set the strict flag.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The caller became a member
    Accepted(Membership),
    /// The invite was discarded
    Rejected,
}

/// Creates, lists and consumes invites.
pub struct InvitationEngine<S: ?Sized> {
    store: Arc<S>,
    authority: MembershipAuthority<S>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl<S> InvitationEngine<S>
where
    S: IdentityStore + OrganizationStore + MembershipStore + InviteStore + ?Sized,
{
    /// Create an engine over the given store and dispatcher.
    pub fn new(store: Arc<S>, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            authority: MembershipAuthority::new(store.clone()),
            store,
            dispatcher,
        }
    }

    /// Invite a user (by username or email) or a bare email address.
    #[instrument(skip(self, actor, organization, request), fields(actor_id = actor.id, organization_id = organization.id))]
    pub async fn create(
        &self,
        actor: &User,
        organization: &Organization,
        request: CreateInvite,
    ) -> AccessResult<Invite> {
        self.authority.require_access(actor, organization.id).await?;

        let handle = request
            .handle
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AccessError::required("handle"))?;

        match self.find_user(handle).await? {
            Some(invitee) => {
                if self
                    .store
                    .membership_exists(invitee.id, organization.id)
                    .await?
                {
                    return Err(AccessError::already_member());
                }

                let invite = self
                    .store
                    .create_invite(NewInvite::for_user(
                        organization.id,
                        actor.id,
                        invitee.id,
                        request.role,
                        request.strict,
                    ))
                    .await?;
                info!(invite_id = invite.id, invitee_id = invitee.id, "Existing user invited");

                notify(
                    self.dispatcher.as_ref(),
                    Notification::InviteExistingUser {
                        invite_id: invite.id,
                        organization_id: organization.id,
                        inviter_id: actor.id,
                        user_id: invitee.id,
                        email: invitee.email,
                        token: invite.token.clone(),
                    },
                )
                .await;
                Ok(invite)
            }
            None => {
                if !handle.contains('@') {
                    return Err(AccessError::validation(
                        "handle",
                        "does not match user or existing email",
                    ));
                }

                let invite = self
                    .store
                    .create_invite(NewInvite::for_email(
                        organization.id,
                        actor.id,
                        handle,
                        request.role,
                        request.strict,
                    ))
                    .await?;
                info!(invite_id = invite.id, "Email invited");

                notify(
                    self.dispatcher.as_ref(),
                    Notification::InviteByEmail {
                        invite_id: invite.id,
                        organization_id: organization.id,
                        inviter_id: actor.id,
                        email: invite.email.clone(),
                        token: invite.token.clone(),
                    },
                )
                .await;
                Ok(invite)
            }
        }
    }

    /// Pending invites of an organization.
    pub async fn list(&self, actor: &User, organization: &Organization) -> AccessResult<Vec<Invite>> {
        self.authority.require_access(actor, organization.id).await?;
        Ok(self.store.list_invites(organization.id).await?)
    }

    /// Accept or reject the invite carrying `token`.
    ///
    /// Any authenticated user holding the token may consume the invite.
    #[instrument(skip(self, actor, token, action), fields(actor_id = actor.id, action = action.as_str()))]
    pub async fn join(&self, actor: &User, token: &str, action: JoinAction) -> AccessResult<JoinOutcome> {
        if token.is_empty() {
            return Err(AccessError::required("token"));
        }

        let invite = self
            .store
            .find_invite_by_token(token)
            .await?
            .filter(|invite| invite.matches_token(token))
            .ok_or_else(|| AccessError::NotFound("invite".to_string()))?;

        if !invite.strict_allows(actor.id) {
            warn!(
                invite_id = invite.id,
                invited_user_id = invite.invited_user_id,
                "Strict invite consumed by a different user"
            );
        }

        match action {
            JoinAction::Reject => {
                if !self.store.delete_invite(invite.id).await? {
                    return Err(AccessError::NotFound("invite".to_string()));
                }
                info!(invite_id = invite.id, "Invite rejected");
                Ok(JoinOutcome::Rejected)
            }
            JoinAction::Accept => match self.store.accept_invite(invite.id, actor.id).await? {
                AcceptOutcome::Joined(membership) => {
                    info!(
                        invite_id = invite.id,
                        organization_id = membership.organization_id,
                        role = membership.role.value(),
                        "Invite accepted"
                    );
                    Ok(JoinOutcome::Accepted(membership))
                }
                AcceptOutcome::AlreadyMember(_) => Err(AccessError::already_member()),
                AcceptOutcome::Gone => Err(AccessError::NotFound("invite".to_string())),
            },
        }
    }

    /// Resolve a handle by exact email, then exact username.
    async fn find_user(&self, handle: &str) -> AccessResult<Option<User>> {
        if let Some(user) = self.store.find_user_by_email(handle).await? {
            return Ok(Some(user));
        }
        let user = self.store.find_user_by_username(handle).await?;
        debug!(found = user.is_some(), "Resolved invite handle");
        Ok(user)
    }
}
