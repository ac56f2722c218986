//! # Tenancy Organization Model
//!
//! This crate provides the entity shapes shared by the tenancy workflows.
//!
//! ## Overview
//!
//! The tenancy-org crate handles:
//! - **Users**: the identity view the core reads (active and superuser flags)
//! - **Organizations**: tenant boundaries
//! - **Memberships**: unique user-organization pairs with an integer role
//! - **Invites**: single-use, token-bearing offers to join an organization
//! - **Email verifications**: one per user, reset on every address change
//! - **Request context**: the immutable caller + organization value handed
//!   to organization-scoped handlers
//!
//! ## Architecture
//!
//! ```text
//! User
//!   ├─ Membership (role) ─→ Organization
//!   │                          └─ Invite (token) ─→ Membership on accept
//!   └─ EmailVerification (token)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tenancy_org::{Membership, NewInvite, Organization, OrganizationRole};
//!
//! let org = Organization::new(1, "Acme Corp");
//! let admin = Membership::new(1, 10, org.id, OrganizationRole::ADMIN);
//!
//! // Invite somebody by email; the token is generated here
//! let invite = NewInvite::for_email(org.id, admin.user_id, "new@example.com", OrganizationRole::MEMBER, false);
//! ```
//!
//! Stores assign ids and persist these values; see `tenancy-access`.

pub mod context;
pub mod invite;
pub mod membership;
pub mod organization;
pub mod roles;
pub mod user;
pub mod verification;

// Re-export main types for convenience
pub use context::{RequestContext, NULL_ORGANIZATION_HINT, ORGANIZATION_HEADER};
pub use invite::{AcceptOutcome, Invite, InviteId, JoinAction, NewInvite};
pub use membership::{Membership, MembershipId, MembershipInsert};
pub use organization::{Organization, OrganizationId};
pub use roles::OrganizationRole;
pub use user::{Caller, User, UserId};
pub use verification::{EmailVerification, VerificationId};
