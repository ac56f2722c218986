//! Request authentication.
//!
//! Turns the `Authorization` header of an inbound request into a
//! [`Caller`]. A missing header is anonymous. A header that is present but
//! does not carry a valid access token for an active user is refused, it
//! never falls back to anonymous.

use std::sync::Arc;
use tracing::{debug, instrument};

use tenancy_auth::JwtService;
use tenancy_org::Caller;

use crate::error::{AccessError, AccessResult};
use crate::store::IdentityStore;

fn denied() -> AccessError {
    AccessError::AccessDenied("Incorrect authentication credentials.".to_string())
}

/// Authenticates access tokens against the identity store.
pub struct Authenticator<S: ?Sized> {
    store: Arc<S>,
    tokens: Arc<JwtService>,
}

impl<S> Authenticator<S>
where
    S: IdentityStore + ?Sized,
{
    /// Create an authenticator over the given store and token service.
    pub fn new(store: Arc<S>, tokens: Arc<JwtService>) -> Self {
        Self { store, tokens }
    }

    /// Resolve the caller from a raw `Authorization` header value.
    ///
    /// Accepts `JWT <token>` and `Bearer <token>`. A blank header counts as
    /// missing.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, authorization: Option<&str>) -> AccessResult<Caller> {
        let Some(header) = authorization.map(str::trim).filter(|h| !h.is_empty()) else {
            return Ok(Caller::Anonymous);
        };

        let claims = JwtService::token_from_header(header)
            .and_then(|token| self.tokens.validate_token(token))
            .map_err(|e| {
                debug!(error = %e, "Rejected access token");
                denied()
            })?;

        let user_id = claims.user_id().ok_or_else(denied)?;
        let user = self
            .store
            .find_user(user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(denied)?;

        debug!(user_id = user.id, "Authenticated caller");
        Ok(Caller::Authenticated(user))
    }
}
