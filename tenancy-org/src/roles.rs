//! Membership roles
//!
//! A role is stored as a plain integer on memberships and invites. Two
//! values have a fixed meaning; any other integer is carried through
//! untouched so applications can define their own ladder on top.

use serde::{Deserialize, Serialize};

/// User role within an organization.
///
/// # Examples
///
/// ```
/// use tenancy_org::OrganizationRole;
///
/// assert_eq!(OrganizationRole::default(), OrganizationRole::MEMBER);
/// assert!(OrganizationRole::ADMIN.is_admin());
/// assert_eq!(OrganizationRole::from(7).value(), 7);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct OrganizationRole(i32);

impl OrganizationRole {
    /// Regular member (the default for new memberships)
    pub const MEMBER: Self = Self(0);

    /// Organization administrator (assigned to the signing-up user)
    pub const ADMIN: Self = Self(1);

    /// Wrap a raw role value.
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Raw integer value as stored.
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Check if this role has admin privileges.
    pub fn is_admin(&self) -> bool {
        *self >= Self::ADMIN
    }

    /// Parse a role from its name or integer form.
    ///
    /// # Examples
    ///
    /// ```
    /// use tenancy_org::OrganizationRole;
    ///
    /// assert_eq!(OrganizationRole::parse("admin"), Some(OrganizationRole::ADMIN));
    /// assert_eq!(OrganizationRole::parse("MEMBER"), Some(OrganizationRole::MEMBER));
    /// assert_eq!(OrganizationRole::parse("3"), Some(OrganizationRole::new(3)));
    /// assert_eq!(OrganizationRole::parse("owner"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "member" => Some(Self::MEMBER),
            "admin" => Some(Self::ADMIN),
            other => other.parse().ok().map(Self),
        }
    }

    /// Get a human-readable display name for the role.
    pub fn display_name(&self) -> String {
        match *self {
            Self::MEMBER => "Member".to_string(),
            Self::ADMIN => "Admin".to_string(),
            Self(other) => format!("Role {}", other),
        }
    }
}

impl Default for OrganizationRole {
    fn default() -> Self {
        Self::MEMBER
    }
}

impl From<i32> for OrganizationRole {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<OrganizationRole> for i32 {
    fn from(role: OrganizationRole) -> Self {
        role.0
    }
}

impl std::fmt::Display for OrganizationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
