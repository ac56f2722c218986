//! Request context for organization-scoped handlers
//!
//! This module provides the `RequestContext` value that records who a
//! request acts as and which organization it acts on. The resolver builds
//! it once per request; handlers receive it by reference and never mutate
//! it.

use crate::organization::{Organization, OrganizationId};
use crate::user::{Caller, User};

/// Header carrying the organization hint on inbound requests.
pub const ORGANIZATION_HEADER: &str = "Organization";

/// Hint value clients send when they explicitly have no organization.
pub const NULL_ORGANIZATION_HINT: &str = "null";

/// Caller plus the organization the request acts on.
///
/// # Examples
///
/// ```
/// use tenancy_org::{Caller, Organization, RequestContext, User};
///
/// let user = User::new(1, "john", "john@example.com");
/// let ctx = RequestContext::new(Caller::from(user))
///     .with_organization(Organization::new(2, "acme"));
///
/// assert_eq!(ctx.organization_id(), Some(2));
/// assert_eq!(ctx.user().map(|u| u.id), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    caller: Caller,
    organization: Option<Organization>,
}

impl RequestContext {
    /// Creates a context with no organization selected.
    pub fn new(caller: Caller) -> Self {
        Self {
            caller,
            organization: None,
        }
    }

    /// Context for an unauthenticated request.
    pub fn anonymous() -> Self {
        Self::new(Caller::Anonymous)
    }

    /// Return a context acting on the given organization.
    pub fn with_organization(mut self, organization: Organization) -> Self {
        self.organization = Some(organization);
        self
    }

    /// Who the request acts as.
    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    /// The authenticated user, if any.
    pub fn user(&self) -> Option<&User> {
        self.caller.user()
    }

    /// The resolved organization, if any.
    pub fn organization(&self) -> Option<&Organization> {
        self.organization.as_ref()
    }

    /// The resolved organization's id, if any.
    pub fn organization_id(&self) -> Option<OrganizationId> {
        self.organization.as_ref().map(|o| o.id)
    }
}
