//! In-memory store implementing every tenancy storage trait.
//!
//! All tables live behind one `tokio::sync::Mutex`, so each trait call runs
//! as a single critical section. That makes get-or-create, invite
//! acceptance and compare-and-set verification atomic without further
//! locking. Cloning shares the same underlying data.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use tenancy_org::{
    AcceptOutcome, EmailVerification, Invite, InviteId, Membership, MembershipInsert, NewInvite,
    Organization, OrganizationId, OrganizationRole, User, UserId, VerificationId,
};

use super::{
    AccountRows, AccountStore, IdentityStore, InviteStore, MembershipStore, NewUser,
    OrganizationStore, StoreError, StoreResult, VerificationStore,
};

#[derive(Default)]
struct State {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    organizations: BTreeMap<OrganizationId, Organization>,
    memberships: BTreeMap<i64, Membership>,
    invites: BTreeMap<InviteId, Invite>,
    verifications: BTreeMap<VerificationId, EmailVerification>,
}

impl State {
    /// Ids are shared across tables and strictly increase.
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        !email.is_empty()
            && self
                .users
                .values()
                .any(|u| u.email == email && Some(u.id) != except)
    }

    fn check_new_user(&self, user: &NewUser) -> StoreResult<()> {
        if self.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("username".to_string()));
        }
        if self.email_taken(&user.email, None) {
            return Err(StoreError::Conflict("email".to_string()));
        }
        Ok(())
    }

    fn insert_user(&mut self, new_user: NewUser) -> User {
        let mut user = User::new(self.allocate_id(), new_user.username, new_user.email)
            .with_superuser(new_user.is_superuser);
        user.first_name = new_user.first_name;
        user.last_name = new_user.last_name;
        user.password_hash = new_user.password_hash;
        user.is_active = new_user.is_active;

        self.users.insert(user.id, user.clone());
        user
    }

    fn insert_organization(&mut self, name: &str) -> Organization {
        let organization = Organization::new(self.allocate_id(), name);
        self.organizations
            .insert(organization.id, organization.clone());
        organization
    }

    fn find_membership(&self, user_id: UserId, organization_id: OrganizationId) -> Option<&Membership> {
        self.memberships
            .values()
            .find(|m| m.is_for(user_id, organization_id))
    }

    fn insert_membership(
        &mut self,
        user_id: UserId,
        organization_id: OrganizationId,
        role: OrganizationRole,
    ) -> Membership {
        let membership = Membership::new(self.allocate_id(), user_id, organization_id, role);
        self.memberships.insert(membership.id, membership.clone());
        membership
    }
}

/// In-memory store for tests and single-process deployments.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an invite row as-is, token included (for test setup).
    pub async fn insert_invite(&self, invite: Invite) {
        self.state.lock().await.invites.insert(invite.id, invite);
    }

    /// Insert a verification row as-is, token included (for test setup).
    pub async fn insert_verification(&self, verification: EmailVerification) {
        let mut state = self.state.lock().await;
        state
            .verifications
            .retain(|_, v| v.user_id != verification.user_id);
        state.verifications.insert(verification.id, verification);
    }

    /// Number of membership rows for a pair.
    pub async fn membership_count(&self, user_id: UserId, organization_id: OrganizationId) -> usize {
        self.state
            .lock()
            .await
            .memberships
            .values()
            .filter(|m| m.is_for(user_id, organization_id))
            .count()
    }

    /// Find an invite by id.
    pub async fn find_invite(&self, id: InviteId) -> Option<Invite> {
        self.state.lock().await.invites.get(&id).cloned()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_superusers(&self) -> StoreResult<Vec<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().filter(|u| u.is_superuser).cloned().collect())
    }

    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut state = self.state.lock().await;
        state.check_new_user(&new_user)?;
        Ok(state.insert_user(new_user))
    }

    async fn set_password_hash(&self, user_id: UserId, password_hash: String) -> StoreResult<User> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        user.password_hash = password_hash;
        Ok(user.clone())
    }

    async fn update_email(&self, user_id: UserId, email: &str) -> StoreResult<User> {
        let mut state = self.state.lock().await;
        if state.email_taken(email, Some(user_id)) {
            return Err(StoreError::Conflict("email".to_string()));
        }
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        user.email = email.to_string();
        Ok(user.clone())
    }
}

#[async_trait]
impl OrganizationStore for MemoryStore {
    async fn find_organization(&self, id: OrganizationId) -> StoreResult<Option<Organization>> {
        Ok(self.state.lock().await.organizations.get(&id).cloned())
    }

    async fn create_organization(&self, name: &str) -> StoreResult<Organization> {
        Ok(self.state.lock().await.insert_organization(name))
    }

    async fn list_organizations(&self) -> StoreResult<Vec<Organization>> {
        Ok(self.state.lock().await.organizations.values().cloned().collect())
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn membership_exists(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state.find_membership(user_id, organization_id).is_some())
    }

    async fn find_membership(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> StoreResult<Option<Membership>> {
        let state = self.state.lock().await;
        Ok(state.find_membership(user_id, organization_id).cloned())
    }

    async fn latest_membership(&self, user_id: UserId) -> StoreResult<Option<Membership>> {
        let state = self.state.lock().await;
        Ok(state
            .memberships
            .values()
            .rev()
            .find(|m| m.user_id == user_id)
            .cloned())
    }

    async fn list_memberships(&self, user_id: UserId) -> StoreResult<Vec<Membership>> {
        let state = self.state.lock().await;
        Ok(state
            .memberships
            .values()
            .rev()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_or_create_membership(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
        role: OrganizationRole,
    ) -> StoreResult<MembershipInsert> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.find_membership(user_id, organization_id) {
            return Ok(MembershipInsert::Existing(existing.clone()));
        }
        Ok(MembershipInsert::Created(state.insert_membership(
            user_id,
            organization_id,
            role,
        )))
    }
}

#[async_trait]
impl InviteStore for MemoryStore {
    async fn create_invite(&self, invite: NewInvite) -> StoreResult<Invite> {
        let mut state = self.state.lock().await;
        if state.invites.values().any(|i| i.token == invite.token) {
            return Err(StoreError::Conflict("token".to_string()));
        }
        let invite = invite.into_invite(state.allocate_id());
        state.invites.insert(invite.id, invite.clone());
        Ok(invite)
    }

    async fn find_invite_by_token(&self, token: &str) -> StoreResult<Option<Invite>> {
        let state = self.state.lock().await;
        Ok(state.invites.values().find(|i| i.token == token).cloned())
    }

    async fn list_invites(&self, organization_id: OrganizationId) -> StoreResult<Vec<Invite>> {
        let state = self.state.lock().await;
        Ok(state
            .invites
            .values()
            .filter(|i| i.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn delete_invite(&self, id: InviteId) -> StoreResult<bool> {
        Ok(self.state.lock().await.invites.remove(&id).is_some())
    }

    async fn accept_invite(&self, id: InviteId, user_id: UserId) -> StoreResult<AcceptOutcome> {
        let mut state = self.state.lock().await;

        let Some(invite) = state.invites.get(&id) else {
            return Ok(AcceptOutcome::Gone);
        };
        let (organization_id, role) = (invite.organization_id, invite.role);

        if let Some(existing) = state.find_membership(user_id, organization_id) {
            return Ok(AcceptOutcome::AlreadyMember(existing.clone()));
        }

        let membership = state.insert_membership(user_id, organization_id, role);
        state.invites.remove(&id);
        Ok(AcceptOutcome::Joined(membership))
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    async fn find_verification_by_token(
        &self,
        token: &str,
    ) -> StoreResult<Option<EmailVerification>> {
        let state = self.state.lock().await;
        Ok(state
            .verifications
            .values()
            .find(|v| v.token == token)
            .cloned())
    }

    async fn find_verification(&self, user_id: UserId) -> StoreResult<Option<EmailVerification>> {
        let state = self.state.lock().await;
        Ok(state
            .verifications
            .values()
            .find(|v| v.user_id == user_id)
            .cloned())
    }

    async fn reset_verification(
        &self,
        user_id: UserId,
        previous_email: Option<String>,
    ) -> StoreResult<EmailVerification> {
        let mut state = self.state.lock().await;

        let existing = state
            .verifications
            .values()
            .find(|v| v.user_id == user_id)
            .map(|v| v.id);
        let id = match existing {
            Some(id) => id,
            None => {
                let id = state.allocate_id();
                state
                    .verifications
                    .insert(id, EmailVerification::new(id, user_id));
                id
            }
        };

        let verification = state
            .verifications
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("verification {}", id)))?;
        match previous_email {
            Some(previous) => verification.reset_for_change(previous),
            None => verification.reset(),
        }
        Ok(verification.clone())
    }

    async fn mark_verified(&self, id: VerificationId) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.verifications.get_mut(&id) {
            Some(verification) if !verification.verified => {
                verification.verified = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn register_account(
        &self,
        new_user: NewUser,
        organization_name: &str,
    ) -> StoreResult<AccountRows> {
        let mut state = self.state.lock().await;
        state.check_new_user(&new_user)?;

        let user = state.insert_user(new_user);
        let organization = state.insert_organization(organization_name);
        let membership = state.insert_membership(user.id, organization.id, OrganizationRole::ADMIN);

        let id = state.allocate_id();
        let verification = EmailVerification::new(id, user.id);
        state.verifications.insert(id, verification.clone());

        Ok(AccountRows {
            user,
            organization,
            membership,
            verification,
        })
    }
}
