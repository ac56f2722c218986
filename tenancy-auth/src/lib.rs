//! # Tenancy Authentication Primitives
//!
//! This crate provides the token and credential building blocks used by the
//! tenancy workflows.
//!
//! ## Overview
//!
//! The tenancy-auth crate handles:
//! - **Token codec**: single-use UUID tokens and composite
//!   `"<user_id>-<secret>"` password-reset tokens
//! - **Reset secrets**: signed, expiring secrets bound to the user's current
//!   password hash (JWT, HS256)
//! - **Access tokens**: login JWTs issued at signup and checked on the
//!   `Authorization` header
//! - **Passwords**: Argon2id hashing and verification
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tenancy_auth::{token, JwtResetTokens, ResetTokenService};
//!
//! let service = JwtResetTokens::with_secret("your-secret-key").unwrap();
//!
//! // Issue a reset link token for user 42
//! let secret = service.issue(42, "$argon2id$...").unwrap();
//! let link_token = token::encode(42, &secret);
//!
//! // Later, when the link is followed
//! let (user_id, secret) = token::decode(&link_token).unwrap();
//! assert!(service.verify(user_id, "$argon2id$...", secret));
//! ```
//!
//! ## Integration
//!
//! - `tenancy-org`: entity tokens are generated with [`token::generate`]
//! - `tenancy-access`: the verification engine combines the codec with a
//!   [`ResetTokenService`]; signup and request authentication use
//!   [`JwtService`]

pub mod error;
pub mod jwt;
pub mod password;
pub mod reset;
pub mod token;

// Re-export main types
pub use error::{AuthError, AuthResult};
pub use jwt::{AccessClaims, JwtConfig, JwtService};
pub use reset::{JwtResetTokens, ResetTokenConfig, ResetTokenService};
