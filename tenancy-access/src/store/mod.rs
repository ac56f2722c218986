//! Storage traits for tenancy entities.
//!
//! Each trait covers one table. Implementations must enforce uniqueness of
//! `(user_id, organization_id)` memberships and of invite and verification
//! tokens. The methods documented as atomic must be a single transaction
//! (or a constraint-guarded write) in a relational backend.

use async_trait::async_trait;
use thiserror::Error;

use tenancy_org::{
    AcceptOutcome, EmailVerification, Invite, InviteId, Membership, MembershipInsert, NewInvite,
    Organization, OrganizationId, OrganizationRole, User, UserId, VerificationId,
};

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::MemoryStore;

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint would be violated; carries the field name
    /// (`username`, `email`, `token`)
    #[error("Conflict: {0} already taken")]
    Conflict(String),

    /// Row to update does not exist
    #[error("Row not found: {0}")]
    NotFound(String),

    /// Backend failure (connection, query, serialization)
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Account fields for a user that has not been persisted yet.
#[derive(Clone, Default)]
pub struct NewUser {
    /// Unique login name
    pub username: String,
    /// Email address
    pub email: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// PHC-formatted password hash
    pub password_hash: String,
    /// Whether the account may log in
    pub is_active: bool,
    /// Whether the account may act in any organization
    pub is_superuser: bool,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("is_active", &self.is_active)
            .field("is_superuser", &self.is_superuser)
            .finish()
    }
}

/// Rows written by one signup.
#[derive(Debug, Clone)]
pub struct AccountRows {
    /// The new user
    pub user: User,
    /// The user's own organization
    pub organization: Organization,
    /// Admin membership joining the two
    pub membership: Membership,
    /// Unverified email verification row
    pub verification: EmailVerification,
}

/// Identity collaborator.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find a user by id.
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Find a user by exact email.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Find a user by exact username.
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// List every superuser.
    async fn list_superusers(&self) -> StoreResult<Vec<User>>;

    /// Persist a new user.
    ///
    /// Fails with [`StoreError::Conflict`] naming `username` or `email` if
    /// the username or a non-empty email is already taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    /// Replace a user's password hash.
    async fn set_password_hash(&self, user_id: UserId, password_hash: String) -> StoreResult<User>;

    /// Change a user's email.
    ///
    /// Fails with `StoreError::Conflict("email")` if another user has the
    /// address.
    async fn update_email(&self, user_id: UserId, email: &str) -> StoreResult<User>;
}

/// Organization table.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Find an organization by id.
    async fn find_organization(&self, id: OrganizationId) -> StoreResult<Option<Organization>>;

    /// Persist a new organization.
    async fn create_organization(&self, name: &str) -> StoreResult<Organization>;

    /// List every organization, oldest first.
    async fn list_organizations(&self) -> StoreResult<Vec<Organization>>;
}

/// Membership table.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Check whether the user belongs to the organization.
    async fn membership_exists(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> StoreResult<bool>;

    /// Get the membership for a pair.
    async fn find_membership(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> StoreResult<Option<Membership>>;

    /// The user's most recently created membership (highest id).
    async fn latest_membership(&self, user_id: UserId) -> StoreResult<Option<Membership>>;

    /// All memberships of a user, newest first.
    async fn list_memberships(&self, user_id: UserId) -> StoreResult<Vec<Membership>>;

    /// Atomic get-or-create.
    ///
    /// An existing membership is returned untouched; its role is never
    /// changed.
    async fn get_or_create_membership(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
        role: OrganizationRole,
    ) -> StoreResult<MembershipInsert>;
}

/// Invite table.
#[async_trait]
pub trait InviteStore: Send + Sync {
    /// Persist a new invite with the token it carries.
    async fn create_invite(&self, invite: NewInvite) -> StoreResult<Invite>;

    /// Find an invite by exact token.
    async fn find_invite_by_token(&self, token: &str) -> StoreResult<Option<Invite>>;

    /// Pending invites of an organization, oldest first.
    async fn list_invites(&self, organization_id: OrganizationId) -> StoreResult<Vec<Invite>>;

    /// Delete an invite. Returns whether this call removed it.
    async fn delete_invite(&self, id: InviteId) -> StoreResult<bool>;

    /// Atomically consume an invite into a membership for `user_id`.
    ///
    /// In one step: the invite must still exist, an existing membership
    /// leaves everything untouched, otherwise the membership is created
    /// with the invite's role and the invite is deleted.
    async fn accept_invite(&self, id: InviteId, user_id: UserId) -> StoreResult<AcceptOutcome>;
}

/// Email verification table.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Find a verification by exact (normalized) token.
    async fn find_verification_by_token(&self, token: &str)
        -> StoreResult<Option<EmailVerification>>;

    /// The user's verification row.
    async fn find_verification(&self, user_id: UserId) -> StoreResult<Option<EmailVerification>>;

    /// Create or reset the user's verification row.
    ///
    /// The row ends up unverified with a fresh token. `previous_email`
    /// is recorded when given.
    async fn reset_verification(
        &self,
        user_id: UserId,
        previous_email: Option<String>,
    ) -> StoreResult<EmailVerification>;

    /// Compare-and-set `verified` from false to true.
    ///
    /// Returns false if the row is gone or was already verified.
    async fn mark_verified(&self, id: VerificationId) -> StoreResult<bool>;
}

/// Signup across the identity, organization, membership and verification
/// tables.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Atomically create a user together with its own organization.
    ///
    /// In one step: the user, an organization named `organization_name`, an
    /// admin membership joining them and an unverified email verification.
    /// A username or email conflict fails with [`StoreError::Conflict`]
    /// naming the field and writes nothing.
    async fn register_account(
        &self,
        user: NewUser,
        organization_name: &str,
    ) -> StoreResult<AccountRows>;
}

/// Every table the tenancy workflows need.
pub trait TenancyStore:
    IdentityStore
    + OrganizationStore
    + MembershipStore
    + InviteStore
    + VerificationStore
    + AccountStore
{
}

impl<T> TenancyStore for T where
    T: IdentityStore
        + OrganizationStore
        + MembershipStore
        + InviteStore
        + VerificationStore
        + AccountStore
{
}
