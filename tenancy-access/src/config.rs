//! Tenancy configuration.
//!
//! Loaded once at startup, validated when the [`Tenancy`](crate::Tenancy)
//! facade is built.

use tenancy_auth::{AuthError, JwtConfig, ResetTokenConfig};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    /// Wrap a credential service construction failure for `key`.
    pub fn from_auth(key: &str, error: AuthError) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: error.to_string(),
        }
    }
}

/// Workflow configuration.
#[derive(Debug, Clone)]
pub struct TenancyConfig {
    /// Dispatch `user_created` after signup.
    pub notify_on_signup: bool,

    /// Name given to a signup's organization when none is supplied.
    /// `None` uses the username.
    pub default_organization_name: Option<String>,

    /// Password reset secret settings.
    pub reset: ResetTokenConfig,

    /// Access token settings.
    pub access: JwtConfig,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            notify_on_signup: true,
            default_organization_name: None,
            reset: ResetTokenConfig::default(),
            access: JwtConfig::default(),
        }
    }
}

impl TenancyConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TENANCY_NOTIFY_ON_SIGNUP`: dispatch `user_created` (default: true)
    /// - `TENANCY_DEFAULT_ORGANIZATION`: signup organization name (default: username)
    /// - `TENANCY_RESET_SECRET`, `TENANCY_RESET_ISSUER`, `TENANCY_RESET_TTL_SECS`:
    ///   see [`ResetTokenConfig::from_env`]
    /// - `TENANCY_JWT_SECRET`, `TENANCY_JWT_ISSUER`, `TENANCY_JWT_AUDIENCE`,
    ///   `TENANCY_JWT_TTL_SECS`: see [`JwtConfig::from_env`]
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            notify_on_signup: std::env::var("TENANCY_NOTIFY_ON_SIGNUP")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(default.notify_on_signup),
            default_organization_name: std::env::var("TENANCY_DEFAULT_ORGANIZATION")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            reset: ResetTokenConfig::from_env(),
            access: JwtConfig::from_env(),
        }
    }

    /// Create a configuration signing reset secrets and access tokens with
    /// the given secret.
    ///
    /// The two token kinds carry different claims, so neither validates as
    /// the other.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        Self {
            reset: ResetTokenConfig::with_secret(secret.clone()),
            access: JwtConfig::with_secret(secret),
            ..Default::default()
        }
    }

    /// Validate that all required configuration is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reset.secret.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingEnvVar("TENANCY_RESET_SECRET".to_string()));
        }
        if self.access.secret.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingEnvVar("TENANCY_JWT_SECRET".to_string()));
        }
        if self.reset.ttl <= chrono::Duration::zero() {
            return Err(ConfigError::InvalidValue {
                key: "TENANCY_RESET_TTL_SECS".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.access.access_token_duration <= chrono::Duration::zero() {
            return Err(ConfigError::InvalidValue {
                key: "TENANCY_JWT_TTL_SECS".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}
