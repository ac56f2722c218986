//! Signed, credential-bound password-reset secrets
//!
//! This module issues the secret half of a composite reset token using the
//! jsonwebtoken crate. The secret is bound to the user's current password
//! hash, so changing the password invalidates every secret issued before.

use crate::error::{AuthError, AuthResult};
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Issues and checks password-reset secrets.
///
/// Implementations must make a secret unusable once the password hash it
/// was issued against changes.
pub trait ResetTokenService: Send + Sync {
    /// Issue a short-lived secret for the user with the given password hash.
    fn issue(&self, user_id: i64, password_hash: &str) -> AuthResult<String>;

    /// Check a secret against the user it claims to belong to.
    fn verify(&self, user_id: i64, password_hash: &str, secret: &str) -> bool;
}

/// Reset token configuration.
#[derive(Debug, Clone)]
pub struct ResetTokenConfig {
    /// Secret key for HMAC signing
    pub secret: Option<String>,

    /// Token issuer
    pub issuer: String,

    /// How long an issued secret stays valid
    pub ttl: Duration,
}

impl Default for ResetTokenConfig {
    fn default() -> Self {
        Self {
            secret: None,
            issuer: "tenancy".to_string(),
            ttl: Duration::days(3),
        }
    }
}

impl ResetTokenConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TENANCY_RESET_SECRET`: HMAC signing secret (required at service build time)
    /// - `TENANCY_RESET_ISSUER`: Token issuer (default: tenancy)
    /// - `TENANCY_RESET_TTL_SECS`: Secret lifetime in seconds (default: 3 days)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            secret: std::env::var("TENANCY_RESET_SECRET").ok(),
            issuer: std::env::var("TENANCY_RESET_ISSUER").unwrap_or(default.issuer),
            ttl: std::env::var("TENANCY_RESET_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::seconds)
                .unwrap_or(default.ttl),
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

#[derive(Debug, Serialize, Deserialize)]
struct ResetClaims {
    sub: String,
    iss: String,
    iat: i64,
    exp: i64,
    /// Fingerprint of the password hash the secret was issued against
    fgp: String,
}

/// JWT-backed [`ResetTokenService`].
pub struct JwtResetTokens {
    config: ResetTokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtResetTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtResetTokens")
            .field("issuer", &self.config.issuer)
            .field("ttl", &self.config.ttl)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl JwtResetTokens {
    /// Create a new reset token service.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigError`] when no secret is configured.
    pub fn new(config: ResetTokenConfig) -> AuthResult<Self> {
        let secret = config
            .secret
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::ConfigError("Reset token secret required".to_string()))?;

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
        Self::new(ResetTokenConfig::with_secret(secret))
    }

    /// Get the configuration.
    pub fn config(&self) -> &ResetTokenConfig {
        &self.config
    }

    fn fingerprint(password_hash: &str) -> String {
        let digest = Sha256::digest(password_hash.as_bytes());
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
    }

    fn decode_claims(&self, secret: &str) -> AuthResult<ResetClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);

        decode::<ResetClaims>(secret, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AuthError::InvalidToken("Token expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AuthError::InvalidToken("Invalid signature".to_string())
                }
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

impl ResetTokenService for JwtResetTokens {
    fn issue(&self, user_id: i64, password_hash: &str) -> AuthResult<String> {
        let now = Utc::now();
        let claims = ResetClaims {
            sub: user_id.to_string(),
            iss: self.config.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.config.ttl).timestamp(),
            fgp: Self::fingerprint(password_hash),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Reset token encoding failed: {}", e)))
    }

    fn verify(&self, user_id: i64, password_hash: &str, secret: &str) -> bool {
        match self.decode_claims(secret) {
            Ok(claims) => {
                claims.sub == user_id.to_string() && claims.fgp == Self::fingerprint(password_hash)
            }
            Err(_) => false,
        }
    }
}
