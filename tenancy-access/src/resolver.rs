//! Organization context resolution.
//!
//! Turns a caller plus the raw `Organization` hint of an inbound request
//! into an immutable [`RequestContext`]. Run this before any handler that
//! trusts the request's organization.

use std::sync::Arc;
use tracing::{debug, instrument};

use tenancy_org::{Caller, Organization, OrganizationId, RequestContext, User, NULL_ORGANIZATION_HINT};

use crate::authority::MembershipAuthority;
use crate::error::AccessResult;
use crate::store::{MembershipStore, OrganizationStore};

/// What a raw hint asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationHint {
    /// Absent, blank or the `null` sentinel: use the latest membership
    Default,
    /// Not an integer: resolve to no organization
    Unparseable,
    /// An explicit organization id
    Id(OrganizationId),
}

impl OrganizationHint {
    /// Classify a raw header value.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Default,
            Some(NULL_ORGANIZATION_HINT) => Self::Default,
            Some(value) => value
                .parse()
                .map(Self::Id)
                .unwrap_or(Self::Unparseable),
        }
    }
}

/// Resolves the organization a request acts on.
pub struct OrganizationResolver<S: ?Sized> {
    store: Arc<S>,
    authority: MembershipAuthority<S>,
}

impl<S> OrganizationResolver<S>
where
    S: MembershipStore + OrganizationStore + ?Sized,
{
    /// Create a resolver over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            authority: MembershipAuthority::new(store.clone()),
            store,
        }
    }

    /// Resolve the request context.
    ///
    /// Anonymous callers, unparseable hints and unknown organization ids all
    /// resolve to no organization. An existing organization the caller may
    /// not access fails with `AccessDenied`.
    #[instrument(skip(self, caller), fields(user_id = caller.user().map(|u| u.id)))]
    pub async fn resolve(&self, caller: Caller, hint: Option<&str>) -> AccessResult<RequestContext> {
        let organization = match caller.user() {
            None => None,
            Some(user) => self.organization_for(user, OrganizationHint::parse(hint)).await?,
        };

        debug!(
            organization_id = organization.as_ref().map(|o| o.id),
            "Resolved organization context"
        );

        let context = RequestContext::new(caller);
        Ok(match organization {
            Some(org) => context.with_organization(org),
            None => context,
        })
    }

    async fn organization_for(
        &self,
        user: &User,
        hint: OrganizationHint,
    ) -> AccessResult<Option<Organization>> {
        match hint {
            OrganizationHint::Unparseable => Ok(None),
            OrganizationHint::Id(id) => {
                let Some(org) = self.store.find_organization(id).await? else {
                    return Ok(None);
                };
                self.authority.require_access(user, org.id).await?;
                Ok(Some(org))
            }
            OrganizationHint::Default => match self.store.latest_membership(user.id).await? {
                Some(membership) => Ok(self
                    .store
                    .find_organization(membership.organization_id)
                    .await?),
                None => Ok(None),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessError;
    use crate::store::{IdentityStore, MemoryStore, NewUser};
    use tenancy_org::OrganizationRole;

    #[test]
    fn test_hint_parsing() {
        assert_eq!(OrganizationHint::parse(None), OrganizationHint::Default);
        assert_eq!(OrganizationHint::parse(Some("")), OrganizationHint::Default);
        assert_eq!(OrganizationHint::parse(Some("  ")), OrganizationHint::Default);
        assert_eq!(OrganizationHint::parse(Some("null")), OrganizationHint::Default);
        assert_eq!(OrganizationHint::parse(Some(" 42 ")), OrganizationHint::Id(42));
        assert_eq!(OrganizationHint::parse(Some("acme")), OrganizationHint::Unparseable);
        assert_eq!(OrganizationHint::parse(Some("4.2")), OrganizationHint::Unparseable);
    }

    async fn setup() -> (Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::new());
        let john = store
            .create_user(NewUser {
                username: "john".into(),
                email: "john@example.com".into(),
                is_active: true,
                ..Default::default()
            })
            .await
            .unwrap();
        (store, john)
    }

    #[tokio::test]
    async fn test_anonymous_has_no_organization() {
        let (store, _) = setup().await;
        let org = store.create_organization("acme").await.unwrap();
        let resolver = OrganizationResolver::new(store);

        let ctx = resolver
            .resolve(Caller::Anonymous, Some(&org.id.to_string()))
            .await
            .unwrap();
        assert!(ctx.organization().is_none());
    }

    #[tokio::test]
    async fn test_no_memberships_resolves_to_none() {
        let (store, john) = setup().await;
        let resolver = OrganizationResolver::new(store);

        let ctx = resolver.resolve(john.into(), None).await.unwrap();
        assert!(ctx.organization().is_none());
    }

    #[tokio::test]
    async fn test_foreign_organization_denied() {
        let (store, john) = setup().await;
        let other = store.create_organization("other").await.unwrap();
        let resolver = OrganizationResolver::new(store);

        let err = resolver
            .resolve(john.into(), Some(&other.id.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_superuser_any_organization() {
        let (store, john) = setup().await;
        let other = store.create_organization("other").await.unwrap();
        let resolver = OrganizationResolver::new(store);

        let root = john.with_superuser(true);
        let ctx = resolver
            .resolve(root.into(), Some(&other.id.to_string()))
            .await
            .unwrap();
        assert_eq!(ctx.organization_id(), Some(other.id));
    }

    #[tokio::test]
    async fn test_unparseable_hint_ignores_memberships() {
        let (store, john) = setup().await;
        let acme = store.create_organization("acme").await.unwrap();
        store
            .get_or_create_membership(john.id, acme.id, OrganizationRole::MEMBER)
            .await
            .unwrap();
        let resolver = OrganizationResolver::new(store);

        let ctx = resolver.resolve(john.into(), Some("acme")).await.unwrap();
        assert!(ctx.organization().is_none());
    }
}
