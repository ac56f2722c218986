//! Email verification and password reset.
//!
//! Every rejected token in these flows fails with the same
//! `Validation("token", "invalid token")` error so callers cannot tell an
//! unknown token from a used or forged one. The reset request never fails
//! at all, whether or not the handle matches an account.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use tenancy_auth::{password, token, ResetTokenService};
use tenancy_events::{Notification, NotificationDispatcher};
use tenancy_org::{EmailVerification, User};

use crate::error::{AccessError, AccessResult};
use crate::notify::notify;
use crate::store::{IdentityStore, StoreResult, VerificationStore};

/// Response to every password reset request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetAcknowledgement {
    /// Message shown to the caller
    pub detail: String,
}

impl Default for ResetAcknowledgement {
    fn default() -> Self {
        Self {
            detail: "If an account matches, a password reset link has been sent.".to_string(),
        }
    }
}

/// Email verification and password reset flows.
pub struct VerificationEngine<S: ?Sized> {
    store: Arc<S>,
    tokens: Arc<dyn ResetTokenService>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl<S> VerificationEngine<S>
where
    S: IdentityStore + VerificationStore + ?Sized,
{
    /// Create an engine over the given store, reset token service and dispatcher.
    pub fn new(
        store: Arc<S>,
        tokens: Arc<dyn ResetTokenService>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            store,
            tokens,
            dispatcher,
        }
    }

    /// Confirm an email address.
    ///
    /// Tokens are matched case-insensitively. A token whose row is already
    /// verified is rejected like an unknown one.
    #[instrument(skip_all)]
    pub async fn verify_email(&self, token: &str) -> AccessResult<EmailVerification> {
        let token = EmailVerification::normalize_token(token);
        if token.is_empty() {
            return Err(AccessError::invalid_token());
        }

        let verification = self
            .store
            .find_verification_by_token(&token)
            .await?
            .filter(|v| v.matches_token(&token) && !v.verified)
            .ok_or_else(AccessError::invalid_token)?;

        if !self.store.mark_verified(verification.id).await? {
            return Err(AccessError::invalid_token());
        }

        info!(user_id = verification.user_id, "Email verified");
        Ok(EmailVerification {
            verified: true,
            ..verification
        })
    }

    /// Start a password reset.
    ///
    /// Always returns the same acknowledgement. When `handle` names an
    /// active account a `password_reset_requested` notification carrying a
    /// composite token is dispatched.
    #[instrument(skip_all)]
    pub async fn request_password_reset(&self, handle: &str) -> ResetAcknowledgement {
        let handle = handle.trim();
        if !handle.is_empty() {
            match self.find_user(handle).await {
                Ok(Some(user)) if user.is_active => self.send_reset(user).await,
                Ok(_) => debug!("No active account for reset handle"),
                Err(e) => warn!(error = %e, "Password reset lookup failed"),
            }
        }
        ResetAcknowledgement::default()
    }

    async fn send_reset(&self, user: User) {
        let secret = match self.tokens.issue(user.id, &user.password_hash) {
            Ok(secret) => secret,
            Err(e) => {
                warn!(user_id = user.id, error = %e, "Failed to issue reset token");
                return;
            }
        };

        info!(user_id = user.id, "Password reset requested");
        notify(
            self.dispatcher.as_ref(),
            Notification::PasswordResetRequested {
                user_id: user.id,
                email: user.email,
                token: token::encode(user.id, &secret),
            },
        )
        .await;
    }

    /// Finish a password reset with the composite token from the reset mail.
    #[instrument(skip_all)]
    pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> AccessResult<User> {
        if new_password.trim().is_empty() {
            return Err(AccessError::required("password"));
        }

        let (user_id, secret) = token::decode(token).map_err(|_| AccessError::invalid_token())?;

        let user = self
            .store
            .find_user(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(AccessError::invalid_token)?;

        if !self.tokens.verify(user.id, &user.password_hash, secret) {
            return Err(AccessError::invalid_token());
        }

        let hash = password::hash_password(new_password)?;
        let user = self.store.set_password_hash(user.id, hash).await?;
        info!(user_id = user.id, "Password changed");

        notify(
            self.dispatcher.as_ref(),
            Notification::PasswordChanged {
                user_id: user.id,
                email: user.email.clone(),
            },
        )
        .await;
        Ok(user)
    }

    /// Resolve a handle by exact email, then exact username.
    async fn find_user(&self, handle: &str) -> StoreResult<Option<User>> {
        match self.store.find_user_by_email(handle).await? {
            Some(user) => Ok(Some(user)),
            None => self.store.find_user_by_username(handle).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NewUser};
    use tenancy_auth::JwtResetTokens;
    use tenancy_events::MemoryDispatcher;

    struct Fixture {
        store: Arc<MemoryStore>,
        dispatcher: Arc<MemoryDispatcher>,
        engine: VerificationEngine<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(MemoryDispatcher::new());
        let tokens = Arc::new(JwtResetTokens::with_secret("test-secret").unwrap());
        let engine = VerificationEngine::new(store.clone(), tokens, dispatcher.clone());
        Fixture {
            store,
            dispatcher,
            engine,
        }
    }

    async fn user(store: &MemoryStore, name: &str, active: bool) -> User {
        store
            .create_user(NewUser {
                username: name.into(),
                email: format!("{}@example.com", name),
                password_hash: format!("hash-of-{}", name),
                is_active: active,
                ..Default::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_verify_email_case_insensitive() {
        let f = fixture();
        let john = user(&f.store, "john", true).await;
        let verification = f.store.reset_verification(john.id, None).await.unwrap();

        let presented = format!("  {}  ", verification.token.to_uppercase());
        let verified = f.engine.verify_email(&presented).await.unwrap();
        assert!(verified.verified);
    }

    #[tokio::test]
    async fn test_verify_email_unknown_and_empty() {
        let f = fixture();

        for token in ["", "   ", "not-a-token"] {
            let err = f.engine.verify_email(token).await.unwrap_err();
            assert_eq!(err.to_string(), AccessError::invalid_token().to_string());
        }
    }

    #[tokio::test]
    async fn test_empty_stored_token_never_matches() {
        let f = fixture();
        let mut verification = EmailVerification::new(50, 1);
        verification.token = String::new();
        f.store.insert_verification(verification).await;

        assert!(f.engine.verify_email("").await.is_err());
        assert!(!f.store.find_verification(1).await.unwrap().unwrap().verified);
    }

    #[tokio::test]
    async fn test_reset_request_inactive_user_is_silent() {
        let f = fixture();
        user(&f.store, "ghost", false).await;
        let mut events = f.dispatcher.subscribe("#").await;

        let ack = f.engine.request_password_reset("ghost").await;
        assert_eq!(ack, ResetAcknowledgement::default());
        assert!(events.drain().is_empty());
    }

    #[tokio::test]
    async fn test_reset_request_dispatches_composite_token() {
        let f = fixture();
        let john = user(&f.store, "john", true).await;
        let mut events = f.dispatcher.subscribe("account.password_reset_requested").await;

        f.engine.request_password_reset("john@example.com").await;

        let sent = events.drain();
        assert_eq!(sent.len(), 1);
        match sent[0].parse_payload::<Notification>().unwrap() {
            Notification::PasswordResetRequested { user_id, token, .. } => {
                assert_eq!(user_id, john.id);
                let (decoded_id, _) = token::decode(&token).unwrap();
                assert_eq!(decoded_id, john.id);
            }
            other => panic!("unexpected notification: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_confirm_requires_password() {
        let f = fixture();
        let err = f
            .engine
            .confirm_password_reset("1-whatever", "   ")
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("password"));
    }

    #[tokio::test]
    async fn test_confirm_rejects_inactive_user() {
        let f = fixture();
        let ghost = user(&f.store, "ghost", false).await;
        let secret = JwtResetTokens::with_secret("test-secret")
            .unwrap()
            .issue(ghost.id, &ghost.password_hash)
            .unwrap();

        let err = f
            .engine
            .confirm_password_reset(&token::encode(ghost.id, &secret), "new-password")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), AccessError::invalid_token().to_string());
    }
}
