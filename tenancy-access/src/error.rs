//! Error types for tenancy workflows
//!
//! Every workflow returns one of these kinds. None of them are retried
//! internally; callers map them onto their own transport.

use tenancy_auth::AuthError;
use thiserror::Error;

use crate::store::StoreError;

/// Message shared by every rejected verification or reset token.
pub const INVALID_TOKEN: &str = "invalid token";

/// Message for an invite or membership on an existing member.
pub const ALREADY_MEMBER: &str = "User is already member";

/// Workflow error types.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Malformed or missing input
    #[error("Validation error on {field}: {message}")]
    Validation {
        /// Offending input field
        field: String,
        /// User-facing message
        message: String,
    },

    /// Caller is neither a member of the organization nor a superuser
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Referenced token or resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input was well-formed but violates a workflow invariant
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Persistence collaborator failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Credential collaborator failed
    #[error("Credential error: {0}")]
    Auth(#[from] AuthError),
}

/// Result type for workflow operations.
pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    /// Build a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AccessError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Validation error for a missing or blank field.
    pub fn required(field: impl Into<String>) -> Self {
        Self::validation(field, "This field may not be blank.")
    }

    /// The single error returned for any rejected verification or reset token.
    pub fn invalid_token() -> Self {
        Self::validation("token", INVALID_TOKEN)
    }

    /// Error for acting on an existing membership.
    pub fn already_member() -> Self {
        AccessError::InvalidState(ALREADY_MEMBER.to_string())
    }

    /// The field a validation error refers to.
    pub fn field(&self) -> Option<&str> {
        match self {
            AccessError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AccessError::Validation { .. } => 400,
            AccessError::AccessDenied(_) => 403,
            AccessError::NotFound(_) => 404,
            AccessError::InvalidState(_) => 409,
            AccessError::Store(_) | AccessError::Auth(_) => 500,
        }
    }

    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::Validation { .. } => "VALIDATION_ERROR",
            AccessError::AccessDenied(_) => "ACCESS_DENIED",
            AccessError::NotFound(_) => "NOT_FOUND",
            AccessError::InvalidState(_) => "INVALID_STATE",
            AccessError::Store(_) => "STORE_ERROR",
            AccessError::Auth(_) => "CREDENTIAL_ERROR",
        }
    }
}
