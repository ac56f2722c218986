//! Membership authority.
//!
//! The single answer to "may this user act in this organization". Both the
//! context resolver and every organization-scoped mutation go through
//! [`MembershipAuthority::require_access`].

use std::sync::Arc;
use tracing::{debug, info, instrument};

use tenancy_org::{Membership, Organization, OrganizationId, OrganizationRole, User, UserId};

use crate::error::{AccessError, AccessResult};
use crate::store::{IdentityStore, MembershipStore, OrganizationStore};

/// Decides organization access from superuser flags and memberships.
pub struct MembershipAuthority<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for MembershipAuthority<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> MembershipAuthority<S>
where
    S: MembershipStore + OrganizationStore + ?Sized,
{
    /// Create an authority over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Superuser, or member of the organization.
    pub async fn can_access(&self, user: &User, organization_id: OrganizationId) -> AccessResult<bool> {
        if user.is_superuser {
            return Ok(true);
        }
        let member = self
            .store
            .membership_exists(user.id, organization_id)
            .await?;
        debug!(user_id = user.id, organization_id, member, "Checked membership");
        Ok(member)
    }

    /// Fail with [`AccessError::AccessDenied`] unless `can_access` holds.
    pub async fn require_access(
        &self,
        user: &User,
        organization_id: OrganizationId,
    ) -> AccessResult<()> {
        if self.can_access(user, organization_id).await? {
            Ok(())
        } else {
            Err(AccessError::AccessDenied(
                "You do not have permission to perform this action.".to_string(),
            ))
        }
    }

    /// Organizations the user may see.
    ///
    /// Superusers see every organization. Other users see those they belong
    /// to, newest membership first.
    pub async fn visible_organizations(&self, user: &User) -> AccessResult<Vec<Organization>> {
        if user.is_superuser {
            return Ok(self.store.list_organizations().await?);
        }

        let mut organizations = Vec::new();
        for membership in self.store.list_memberships(user.id).await? {
            if let Some(org) = self
                .store
                .find_organization(membership.organization_id)
                .await?
            {
                organizations.push(org);
            }
        }
        Ok(organizations)
    }
}

impl<S> MembershipAuthority<S>
where
    S: IdentityStore + MembershipStore + OrganizationStore + ?Sized,
{
    /// Add a user to an organization directly.
    ///
    /// The actor must have access to the organization. An existing
    /// membership is left untouched and reported as
    /// [`AccessError::InvalidState`].
    #[instrument(skip(self, actor, organization), fields(actor_id = actor.id, organization_id = organization.id))]
    pub async fn add_member(
        &self,
        actor: &User,
        organization: &Organization,
        user_id: UserId,
        role: OrganizationRole,
    ) -> AccessResult<Membership> {
        self.require_access(actor, organization.id).await?;

        if self.store.find_user(user_id).await?.is_none() {
            return Err(AccessError::NotFound(format!("user {}", user_id)));
        }

        let insert = self
            .store
            .get_or_create_membership(user_id, organization.id, role)
            .await?;
        if !insert.was_created() {
            return Err(AccessError::already_member());
        }

        info!(user_id, role = role.value(), "Member added");
        Ok(insert.membership().clone())
    }
}
