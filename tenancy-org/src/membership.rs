//! Membership domain model
//!
//! A membership links one user to one organization with a role. The pair
//! `(user_id, organization_id)` is unique; stores must enforce it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::organization::OrganizationId;
use crate::roles::OrganizationRole;
use crate::user::UserId;

/// Membership identifier (primary key, increases with creation order).
pub type MembershipId = i64;

/// Organization membership linking a user to an organization.
///
/// # Examples
///
/// ```
/// use tenancy_org::{Membership, OrganizationRole};
///
/// let membership = Membership::new(1, 10, 20, OrganizationRole::ADMIN);
/// assert_eq!(membership.user_id, 10);
/// assert!(membership.role.is_admin());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Unique membership ID
    pub id: MembershipId,

    /// User ID
    pub user_id: UserId,

    /// Organization ID
    pub organization_id: OrganizationId,

    /// Role within the organization
    pub role: OrganizationRole,

    /// When the user joined
    pub created_at: DateTime<Utc>,
}

impl Membership {
    /// Creates a membership value for an id assigned by the store.
    pub fn new(
        id: MembershipId,
        user_id: UserId,
        organization_id: OrganizationId,
        role: OrganizationRole,
    ) -> Self {
        Self {
            id,
            user_id,
            organization_id,
            role,
            created_at: Utc::now(),
        }
    }

    /// Check whether this membership is for the given user and organization.
    pub fn is_for(&self, user_id: UserId, organization_id: OrganizationId) -> bool {
        self.user_id == user_id && self.organization_id == organization_id
    }
}

/// Outcome of an atomic get-or-create of a membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipInsert {
    /// No membership existed; this one was created
    Created(Membership),
    /// A membership already existed and was left untouched
    Existing(Membership),
}

impl MembershipInsert {
    /// The membership that now exists for the pair.
    pub fn membership(&self) -> &Membership {
        match self {
            Self::Created(m) | Self::Existing(m) => m,
        }
    }

    /// Check if this call created the membership.
    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}
