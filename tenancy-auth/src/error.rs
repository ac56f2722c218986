//! Error types for token and credential operations
//!
//! This module defines the errors raised while encoding, decoding and
//! verifying tokens, and while hashing or checking passwords.

use thiserror::Error;

/// Authentication error types.
///
/// These errors describe structural token failures, signature failures
/// and configuration problems. Callers that must not leak which check
/// failed (password reset) collapse all of them into a single user-facing
/// error.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Composite token has no separator or a non-numeric user id
    #[error("Malformed token")]
    MalformedToken,

    /// Token signature, issuer, subject or expiry did not check out
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Password hashing or verification failed
    #[error("Password error: {0}")]
    Password(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Check if this error should be logged at error level.
    ///
    /// Malformed or invalid tokens are expected user input and
    /// should not be logged as errors.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            AuthError::Internal(_) | AuthError::ConfigError(_) | AuthError::Password(_)
        )
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MalformedToken => "MALFORMED_TOKEN",
            AuthError::InvalidToken(_) => "INVALID_TOKEN",
            AuthError::Password(_) => "PASSWORD_ERROR",
            AuthError::ConfigError(_) => "CONFIG_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
