//! # Tenancy Access
//!
//! Authorization and workflow logic for a multi-tenant application:
//!
//! - **Authentication**: who a request acts as, from its access token
//! - **Context resolution**: which organization a request acts on
//! - **Membership authority**: who may act in which organization
//! - **Invitations**: create, accept and reject single-use invites
//! - **Verification**: email confirmation and password reset
//! - **Accounts**: signup and email change
//!
//! Persistence, HTTP and mail delivery stay outside. Storage is reached
//! through the traits in [`store`], notifications through a
//! [`NotificationDispatcher`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tenancy_access::{store::MemoryStore, CreateInvite, Tenancy, TenancyConfig};
//! use tenancy_events::MemoryDispatcher;
//! use tenancy_org::{Caller, JoinAction};
//!
//! async fn example(caller: Caller, header: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
//!     let tenancy = Tenancy::new(
//!         TenancyConfig::from_env(),
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(MemoryDispatcher::new()),
//!     )?;
//!
//!     // Once per request, before any organization-scoped handler
//!     let ctx = tenancy.resolve_context(caller, header).await?;
//!     // or straight from the raw headers:
//!     // tenancy.resolve_request(authorization, header).await?
//!
//!     let invite = tenancy
//!         .create_invite(&ctx, CreateInvite::new("new@example.com"))
//!         .await?;
//!     println!("invite {} created", invite.id);
//!     Ok(())
//! }
//! ```

pub mod accounts;
pub mod authentication;
pub mod authority;
pub mod config;
pub mod error;
pub mod invitations;
mod notify;
pub mod resolver;
pub mod store;
pub mod verification;

use std::sync::Arc;

use tenancy_auth::{JwtResetTokens, JwtService, ResetTokenService};
use tenancy_events::NotificationDispatcher;
use tenancy_org::{
    Caller, EmailVerification, Invite, JoinAction, Membership, Organization, OrganizationRole,
    RequestContext, User, UserId,
};

// Re-export main types
pub use accounts::{Account, AccountEngine, Registration};
pub use authentication::Authenticator;
pub use authority::MembershipAuthority;
pub use config::{ConfigError, TenancyConfig};
pub use error::{AccessError, AccessResult};
pub use invitations::{CreateInvite, InvitationEngine, JoinOutcome};
pub use resolver::{OrganizationHint, OrganizationResolver};
pub use store::{AccountRows, StoreError, StoreResult, TenancyStore};
pub use verification::{ResetAcknowledgement, VerificationEngine};

/// Caller-facing surface, built once at startup.
pub struct Tenancy<S: ?Sized> {
    store: Arc<S>,
    config: TenancyConfig,
    authenticator: Authenticator<S>,
    authority: MembershipAuthority<S>,
    resolver: OrganizationResolver<S>,
    invitations: InvitationEngine<S>,
    verification: VerificationEngine<S>,
    accounts: AccountEngine<S>,
}

impl<S> Tenancy<S>
where
    S: TenancyStore + ?Sized,
{
    /// Build the facade with JWT reset tokens from `config.reset` and
    /// access tokens from `config.access`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration does not validate or
    /// a token service cannot be built from it.
    pub fn new(
        config: TenancyConfig,
        store: Arc<S>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let reset = JwtResetTokens::new(config.reset.clone())
            .map_err(|e| ConfigError::from_auth("TENANCY_RESET_SECRET", e))?;
        let access = JwtService::new(config.access.clone())
            .map_err(|e| ConfigError::from_auth("TENANCY_JWT_SECRET", e))?;
        Ok(Self::with_token_services(
            config,
            store,
            Arc::new(reset),
            Arc::new(access),
            dispatcher,
        ))
    }

    /// Build the facade with custom token services.
    pub fn with_token_services(
        config: TenancyConfig,
        store: Arc<S>,
        reset_tokens: Arc<dyn ResetTokenService>,
        access_tokens: Arc<JwtService>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            authenticator: Authenticator::new(store.clone(), access_tokens.clone()),
            authority: MembershipAuthority::new(store.clone()),
            resolver: OrganizationResolver::new(store.clone()),
            invitations: InvitationEngine::new(store.clone(), dispatcher.clone()),
            verification: VerificationEngine::new(store.clone(), reset_tokens, dispatcher.clone()),
            accounts: AccountEngine::new(store.clone(), access_tokens, dispatcher, config.clone()),
            config,
            store,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The configuration the facade was built with.
    pub fn config(&self) -> &TenancyConfig {
        &self.config
    }

    /// The membership authority.
    pub fn authority(&self) -> &MembershipAuthority<S> {
        &self.authority
    }

    /// Resolve the caller from a raw `Authorization` header value.
    pub async fn authenticate(&self, authorization: Option<&str>) -> AccessResult<Caller> {
        self.authenticator.authenticate(authorization).await
    }

    /// Authenticate a request and resolve its organization in one step.
    ///
    /// An invalid access token fails with `AccessDenied` before the
    /// organization hint is looked at.
    pub async fn resolve_request(
        &self,
        authorization: Option<&str>,
        hint: Option<&str>,
    ) -> AccessResult<RequestContext> {
        let caller = self.authenticate(authorization).await?;
        self.resolver.resolve(caller, hint).await
    }

    /// Resolve the organization a request acts on.
    pub async fn resolve_context(
        &self,
        caller: Caller,
        hint: Option<&str>,
    ) -> AccessResult<RequestContext> {
        self.resolver.resolve(caller, hint).await
    }

    /// Invite someone to the context's organization.
    pub async fn create_invite(
        &self,
        ctx: &RequestContext,
        request: CreateInvite,
    ) -> AccessResult<Invite> {
        let (user, organization) = scoped(ctx)?;
        self.invitations.create(user, organization, request).await
    }

    /// Pending invites of the context's organization.
    pub async fn list_invites(&self, ctx: &RequestContext) -> AccessResult<Vec<Invite>> {
        let (user, organization) = scoped(ctx)?;
        self.invitations.list(user, organization).await
    }

    /// Accept or reject an invite.
    pub async fn join_invite(
        &self,
        ctx: &RequestContext,
        token: &str,
        action: JoinAction,
    ) -> AccessResult<JoinOutcome> {
        self.invitations.join(authenticated(ctx)?, token, action).await
    }

    /// Start a password reset. Never fails.
    pub async fn request_password_reset(&self, handle: &str) -> ResetAcknowledgement {
        self.verification.request_password_reset(handle).await
    }

    /// Finish a password reset.
    pub async fn confirm_password_reset(&self, token: &str, password: &str) -> AccessResult<User> {
        self.verification.confirm_password_reset(token, password).await
    }

    /// Confirm an email address.
    pub async fn verify_email(&self, token: &str) -> AccessResult<EmailVerification> {
        self.verification.verify_email(token).await
    }

    /// Sign up a new account.
    pub async fn register(&self, registration: Registration) -> AccessResult<Account> {
        self.accounts.register(registration).await
    }

    /// Change the caller's email.
    pub async fn change_email(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> AccessResult<EmailVerification> {
        self.accounts.change_email(authenticated(ctx)?, email).await
    }

    /// Add a user to the context's organization directly.
    pub async fn add_member(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        role: OrganizationRole,
    ) -> AccessResult<Membership> {
        let (user, organization) = scoped(ctx)?;
        self.authority.add_member(user, organization, user_id, role).await
    }

    /// Organizations the caller may see.
    pub async fn visible_organizations(
        &self,
        ctx: &RequestContext,
    ) -> AccessResult<Vec<Organization>> {
        self.authority
            .visible_organizations(authenticated(ctx)?)
            .await
    }
}

fn authenticated(ctx: &RequestContext) -> AccessResult<&User> {
    ctx.user().ok_or_else(|| {
        AccessError::AccessDenied("Authentication credentials were not provided.".to_string())
    })
}

fn scoped(ctx: &RequestContext) -> AccessResult<(&User, &Organization)> {
    let user = authenticated(ctx)?;
    let organization = ctx
        .organization()
        .ok_or_else(|| AccessError::validation("organization", "No organization selected."))?;
    Ok((user, organization))
}
