//! JWT access tokens
//!
//! This module issues the login token returned by signup and validates the
//! token presented in the `Authorization` header of later requests. HS256
//! only.

use crate::error::{AuthError, AuthResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header schemes accepted in front of an access token.
pub const AUTHORIZATION_SCHEMES: [&str; 2] = ["JWT", "Bearer"];

/// JWT configuration for access token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: Option<String>,

    /// Token issuer
    pub issuer: String,

    /// Token audience
    pub audience: String,

    /// Access token duration
    pub access_token_duration: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: None,
            issuer: "tenancy".to_string(),
            audience: "tenancy-api".to_string(),
            access_token_duration: Duration::hours(24),
        }
    }
}

impl JwtConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TENANCY_JWT_SECRET`: HMAC signing secret (required at service build time)
    /// - `TENANCY_JWT_ISSUER`: Token issuer (default: tenancy)
    /// - `TENANCY_JWT_AUDIENCE`: Token audience (default: tenancy-api)
    /// - `TENANCY_JWT_TTL_SECS`: Access token lifetime in seconds (default: 24 hours)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            secret: std::env::var("TENANCY_JWT_SECRET").ok(),
            issuer: std::env::var("TENANCY_JWT_ISSUER").unwrap_or(default.issuer),
            audience: std::env::var("TENANCY_JWT_AUDIENCE").unwrap_or(default.audience),
            access_token_duration: std::env::var("TENANCY_JWT_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::seconds)
                .unwrap_or(default.access_token_duration),
        }
    }

    /// Create a configuration with the given signing secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
            ..Default::default()
        }
    }
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// JWT ID
    pub jti: String,

    /// Login name at issue time
    pub username: String,

    /// Email at issue time
    pub email: String,
}

impl AccessClaims {
    /// The user id in `sub`, if it is an integer.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// JWT service for access token operations.
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl JwtService {
    /// Create a new JWT service with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigError`] when no secret is configured.
    pub fn new(config: JwtConfig) -> AuthResult<Self> {
        let secret = config
            .secret
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::ConfigError("Secret required for HMAC".to_string()))?;

        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        Ok(Self {
            config,
            encoding_key,
            decoding_key,
        })
    }

    /// Create with a simple secret and default settings.
    pub fn with_secret(secret: impl Into<String>) -> AuthResult<Self> {
        Self::new(JwtConfig::with_secret(secret))
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(
        &self,
        user_id: i64,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> AuthResult<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            exp: (now + self.config.access_token_duration).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            username: username.into(),
            email: email.into(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> AuthResult<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AuthError::InvalidToken("Token expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AuthError::InvalidToken("Malformed token".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AuthError::InvalidToken("Invalid signature".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    AuthError::InvalidToken("Invalid issuer".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    AuthError::InvalidToken("Invalid audience".to_string())
                }
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }

    /// Extract the token from an `Authorization` header value.
    ///
    /// Accepts `JWT <token>` and `Bearer <token>`.
    pub fn token_from_header(header: &str) -> AuthResult<&str> {
        let (scheme, token) = header
            .trim()
            .split_once(' ')
            .ok_or(AuthError::MalformedToken)?;
        let token = token.trim();
        if token.is_empty() || !AUTHORIZATION_SCHEMES.contains(&scheme) {
            return Err(AuthError::MalformedToken);
        }
        Ok(token)
    }

    /// Get the configuration.
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }
}
