//! Token codec
//!
//! Two kinds of tokens are handled here:
//!
//! 1. **Single-use tokens**: random UUID strings that tie an invite or an
//!    email verification row to the link sent to the user.
//! 2. **Composite tokens**: password-reset tokens of the form
//!    `"<user_id>-<secret>"`, where the secret comes from a
//!    [`ResetTokenService`](crate::reset::ResetTokenService).
//!
//! The codec only parses structure. Whether a secret is valid is decided
//! by the reset token service.

use crate::error::{AuthError, AuthResult};
use uuid::Uuid;

/// Separator between the user id and the secret in a composite token.
pub const COMPOSITE_SEPARATOR: char = '-';

/// Generate a fresh single-use token.
///
/// The token is a random (v4) UUID in its 36-character hyphenated,
/// lowercase form.
///
/// # Examples
///
/// ```
/// let token = tenancy_auth::token::generate();
/// assert_eq!(token.len(), 36);
/// assert_ne!(token, tenancy_auth::token::generate());
/// ```
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

/// Build a composite password-reset token.
///
/// # Examples
///
/// ```
/// use tenancy_auth::token::encode;
///
/// assert_eq!(encode(42, "abc"), "42-abc");
/// ```
pub fn encode(user_id: i64, secret: &str) -> String {
    format!("{}{}{}", user_id, COMPOSITE_SEPARATOR, secret)
}

/// Split a composite token into its user id and secret.
///
/// Splits on the first `-`, so the secret may contain further dashes.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] if there is no separator or the
/// user id part is not a base-10 integer.
///
/// # Examples
///
/// ```
/// use tenancy_auth::token::decode;
///
/// let (user_id, secret) = decode("7-a-b-c").unwrap();
/// assert_eq!(user_id, 7);
/// assert_eq!(secret, "a-b-c");
/// assert!(decode("no-separator-id").is_err());
/// ```
pub fn decode(token: &str) -> AuthResult<(i64, &str)> {
    let (user_id, secret) = token
        .split_once(COMPOSITE_SEPARATOR)
        .ok_or(AuthError::MalformedToken)?;

    if user_id.is_empty() || !user_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AuthError::MalformedToken);
    }

    let user_id = user_id.parse().map_err(|_| AuthError::MalformedToken)?;
    Ok((user_id, secret))
}
