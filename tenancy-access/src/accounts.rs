//! Account workflows: signup and email change.
//!
//! Signup gives every new user their own organization with an admin
//! membership, an unverified email and a login token. Changing the email
//! resets the verification so the new address has to be confirmed.

use std::sync::Arc;
use tracing::{info, instrument};

use tenancy_auth::{password, JwtService};
use tenancy_events::{Notification, NotificationDispatcher};
use tenancy_org::{EmailVerification, Membership, Organization, User};

use crate::config::TenancyConfig;
use crate::error::{AccessError, AccessResult};
use crate::notify::notify;
use crate::store::{AccountRows, AccountStore, IdentityStore, NewUser, StoreError, VerificationStore};

/// Signup input.
#[derive(Clone, Default)]
pub struct Registration {
    /// Unique login name (required)
    pub username: String,
    /// Email address (required)
    pub email: String,
    /// Password (required)
    pub password: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Name for the new organization
    pub organization: Option<String>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("organization", &self.organization)
            .finish()
    }
}

impl Registration {
    /// Signup with the required fields only.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Name the new organization.
    pub fn with_organization(mut self, name: impl Into<String>) -> Self {
        self.organization = Some(name.into());
        self
    }
}

/// Everything a signup created.
#[derive(Clone)]
pub struct Account {
    /// The new user
    pub user: User,
    /// The user's own organization
    pub organization: Organization,
    /// Admin membership in that organization
    pub membership: Membership,
    /// Unverified email verification row
    pub verification: EmailVerification,
    /// Login token for the new user
    pub access_token: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("user", &self.user)
            .field("organization", &self.organization)
            .field("membership", &self.membership)
            .field("verification", &self.verification)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Signup and email change.
pub struct AccountEngine<S: ?Sized> {
    store: Arc<S>,
    tokens: Arc<JwtService>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    config: TenancyConfig,
}

/// Minimal email shape check.
fn require_email(email: &str) -> AccessResult<()> {
    if email.contains('@') {
        Ok(())
    } else {
        Err(AccessError::validation("email", "Enter a valid email address."))
    }
}

fn taken(field: &str) -> AccessError {
    AccessError::validation(field, "already taken")
}

/// Report a unique-field collision on the field that collided.
fn conflict_on_field(error: StoreError) -> AccessError {
    match error {
        StoreError::Conflict(field) if field == "username" || field == "email" => taken(&field),
        other => other.into(),
    }
}

impl<S> AccountEngine<S>
where
    S: IdentityStore + VerificationStore + AccountStore + ?Sized,
{
    /// Create an engine over the given store, access token service and
    /// dispatcher.
    pub fn new(
        store: Arc<S>,
        tokens: Arc<JwtService>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: TenancyConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            dispatcher,
            config,
        }
    }

    /// Create an active account with its own organization.
    #[instrument(skip_all, fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> AccessResult<Account> {
        let username = registration.username.trim();
        let email = registration.email.trim();
        if username.is_empty() {
            return Err(AccessError::required("username"));
        }
        if email.is_empty() {
            return Err(AccessError::required("email"));
        }
        if registration.password.trim().is_empty() {
            return Err(AccessError::required("password"));
        }
        require_email(email)?;

        if self.store.find_user_by_username(username).await?.is_some() {
            return Err(taken("username"));
        }
        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(taken("email"));
        }

        let name = registration
            .organization
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or(self.config.default_organization_name.as_deref())
            .unwrap_or(username);

        let AccountRows {
            user,
            organization,
            membership,
            verification,
        } = self
            .store
            .register_account(
                NewUser {
                    username: username.to_string(),
                    email: email.to_string(),
                    first_name: registration.first_name.trim().to_string(),
                    last_name: registration.last_name.trim().to_string(),
                    password_hash: password::hash_password(&registration.password)?,
                    is_active: true,
                    is_superuser: false,
                },
                name,
            )
            .await
            .map_err(conflict_on_field)?;

        let access_token = self
            .tokens
            .generate_access_token(user.id, &user.username, &user.email)?;

        info!(
            user_id = user.id,
            organization_id = organization.id,
            "Account registered"
        );

        if self.config.notify_on_signup {
            notify(
                self.dispatcher.as_ref(),
                Notification::UserCreated {
                    user_id: user.id,
                    username: user.username.clone(),
                    email: user.email.clone(),
                },
            )
            .await;
        }

        Ok(Account {
            user,
            organization,
            membership,
            verification,
            access_token,
        })
    }

    /// Change a user's email and restart verification.
    ///
    /// Setting the current address again changes nothing and returns the
    /// current verification row.
    #[instrument(skip_all, fields(user_id = user.id))]
    pub async fn change_email(&self, user: &User, new_email: &str) -> AccessResult<EmailVerification> {
        let new_email = new_email.trim();
        if new_email.is_empty() {
            return Err(AccessError::required("email"));
        }
        require_email(new_email)?;

        let current = self
            .store
            .find_user(user.id)
            .await?
            .ok_or_else(|| AccessError::NotFound(format!("user {}", user.id)))?;

        if current.email == new_email {
            return match self.store.find_verification(current.id).await? {
                Some(verification) => Ok(verification),
                None => Ok(self.store.reset_verification(current.id, None).await?),
            };
        }

        if self
            .store
            .find_user_by_email(new_email)
            .await?
            .is_some_and(|other| other.id != current.id)
        {
            return Err(taken("email"));
        }

        let updated = self
            .store
            .update_email(current.id, new_email)
            .await
            .map_err(conflict_on_field)?;

        let verification = self
            .store
            .reset_verification(current.id, Some(current.email.clone()))
            .await?;

        info!("Email changed");

        notify(
            self.dispatcher.as_ref(),
            Notification::EmailChanged {
                user_id: updated.id,
                previous_email: verification.previous_email.clone(),
                email: updated.email,
                verification_token: verification.token.clone(),
            },
        )
        .await;
        Ok(verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, OrganizationStore, StoreResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tenancy_events::MemoryDispatcher;
    use tenancy_org::{OrganizationRole, UserId, VerificationId};

    fn tokens() -> Arc<JwtService> {
        Arc::new(JwtService::with_secret("test-secret").unwrap())
    }

    fn engine(config: TenancyConfig) -> (Arc<MemoryStore>, Arc<MemoryDispatcher>, AccountEngine<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(MemoryDispatcher::new());
        let engine = AccountEngine::new(store.clone(), tokens(), dispatcher.clone(), config);
        (store, dispatcher, engine)
    }

    /// Memory store whose next signup fails in the backend.
    struct FlakyStore {
        inner: MemoryStore,
        fail_signup: AtomicBool,
    }

    #[async_trait]
    impl IdentityStore for FlakyStore {
        async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
            self.inner.find_user(id).await
        }

        async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
            self.inner.find_user_by_email(email).await
        }

        async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
            self.inner.find_user_by_username(username).await
        }

        async fn list_superusers(&self) -> StoreResult<Vec<User>> {
            self.inner.list_superusers().await
        }

        async fn create_user(&self, user: NewUser) -> StoreResult<User> {
            self.inner.create_user(user).await
        }

        async fn set_password_hash(&self, user_id: UserId, password_hash: String) -> StoreResult<User> {
            self.inner.set_password_hash(user_id, password_hash).await
        }

        async fn update_email(&self, user_id: UserId, email: &str) -> StoreResult<User> {
            self.inner.update_email(user_id, email).await
        }
    }

    #[async_trait]
    impl VerificationStore for FlakyStore {
        async fn find_verification_by_token(
            &self,
            token: &str,
        ) -> StoreResult<Option<EmailVerification>> {
            self.inner.find_verification_by_token(token).await
        }

        async fn find_verification(&self, user_id: UserId) -> StoreResult<Option<EmailVerification>> {
            self.inner.find_verification(user_id).await
        }

        async fn reset_verification(
            &self,
            user_id: UserId,
            previous_email: Option<String>,
        ) -> StoreResult<EmailVerification> {
            self.inner.reset_verification(user_id, previous_email).await
        }

        async fn mark_verified(&self, id: VerificationId) -> StoreResult<bool> {
            self.inner.mark_verified(id).await
        }
    }

    #[async_trait]
    impl AccountStore for FlakyStore {
        async fn register_account(
            &self,
            user: NewUser,
            organization_name: &str,
        ) -> StoreResult<AccountRows> {
            if self.fail_signup.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Backend("organization insert failed".into()));
            }
            self.inner.register_account(user, organization_name).await
        }
    }

    #[tokio::test]
    async fn test_register_creates_admin_membership() {
        let (store, dispatcher, engine) = engine(TenancyConfig::default());
        let mut events = dispatcher.subscribe("account.user_created").await;

        let account = engine
            .register(Registration::new("john", "john@example.com", "pw"))
            .await
            .unwrap();

        assert_eq!(account.organization.name, "john");
        assert_eq!(account.membership.role, OrganizationRole::ADMIN);
        let claims = tokens().validate_token(&account.access_token).unwrap();
        assert_eq!(claims.user_id(), Some(account.user.id));
        assert!(!account.verification.verified);
        assert!(account.user.is_active);
        assert!(password::verify_password("pw", &account.user.password_hash).unwrap());
        assert_eq!(store.membership_count(account.user.id, account.organization.id).await, 1);
        assert_eq!(events.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (_, _, engine) = engine(TenancyConfig::default());

        let cases = [
            (Registration::new("", "a@example.com", "pw"), "username"),
            (Registration::new("a", "", "pw"), "email"),
            (Registration::new("a", "a@example.com", " "), "password"),
            (Registration::new("a", "not-an-email", "pw"), "email"),
        ];
        for (registration, field) in cases {
            let err = engine.register(registration).await.unwrap_err();
            assert_eq!(err.field(), Some(field));
        }
    }

    #[tokio::test]
    async fn test_register_taken() {
        let (_, _, engine) = engine(TenancyConfig::default());
        engine
            .register(Registration::new("john", "john@example.com", "pw"))
            .await
            .unwrap();

        let err = engine
            .register(Registration::new("john", "other@example.com", "pw"))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("username"));

        let err = engine
            .register(Registration::new("jim", "john@example.com", "pw"))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("email"));
    }

    #[tokio::test]
    async fn test_failed_signup_leaves_nothing_and_retry_succeeds() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_signup: AtomicBool::new(true),
        });
        let engine = AccountEngine::new(
            store.clone(),
            tokens(),
            Arc::new(MemoryDispatcher::new()),
            TenancyConfig::default(),
        );

        let err = engine
            .register(Registration::new("john", "john@example.com", "pw"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(store.find_user_by_username("john").await.unwrap().is_none());
        assert!(store.inner.list_organizations().await.unwrap().is_empty());

        let account = engine
            .register(Registration::new("john", "john@example.com", "pw"))
            .await
            .unwrap();
        assert_eq!(
            store
                .inner
                .membership_count(account.user.id, account.organization.id)
                .await,
            1
        );
        assert!(store.find_verification(account.user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_register_without_notification() {
        let config = TenancyConfig {
            notify_on_signup: false,
            ..Default::default()
        };
        let (_, dispatcher, engine) = engine(config);
        let mut events = dispatcher.subscribe("#").await;

        let account = engine
            .register(Registration::new("john", "john@example.com", "pw").with_organization("Acme"))
            .await
            .unwrap();
        assert_eq!(account.organization.name, "Acme");
        assert!(events.drain().is_empty());
    }

    #[tokio::test]
    async fn test_change_email_resets_verification() {
        let (store, dispatcher, engine) = engine(TenancyConfig::default());
        let account = engine
            .register(Registration::new("john", "john@example.com", "pw"))
            .await
            .unwrap();
        let first = store.find_verification(account.user.id).await.unwrap().unwrap();
        store.mark_verified(first.id).await.unwrap();
        let mut events = dispatcher.subscribe("account.email_changed").await;

        let verification = engine
            .change_email(&account.user, "john@new.example.com")
            .await
            .unwrap();

        assert!(!verification.verified);
        assert_ne!(verification.token, first.token);
        assert_eq!(verification.previous_email.as_deref(), Some("john@example.com"));
        assert_eq!(events.drain().len(), 1);

        let stored = store.find_user(account.user.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "john@new.example.com");
    }

    #[tokio::test]
    async fn test_change_email_unchanged_is_noop() {
        let (store, _, engine) = engine(TenancyConfig::default());
        let account = engine
            .register(Registration::new("john", "john@example.com", "pw"))
            .await
            .unwrap();

        let verification = engine
            .change_email(&account.user, "john@example.com")
            .await
            .unwrap();
        assert_eq!(verification.token, account.verification.token);
        assert_eq!(store.find_verification(account.user.id).await.unwrap(), Some(verification));
    }

    #[tokio::test]
    async fn test_change_email_taken() {
        let (_, _, engine) = engine(TenancyConfig::default());
        let john = engine
            .register(Registration::new("john", "john@example.com", "pw"))
            .await
            .unwrap();
        engine
            .register(Registration::new("jane", "jane@example.com", "pw"))
            .await
            .unwrap();

        let err = engine
            .change_email(&john.user, "jane@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("email"));
    }
}
