//! Organization domain model
//!
//! Organizations are the tenant boundary. Users reach resources only
//! through organizations they belong to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Organization identifier (primary key).
pub type OrganizationId = i64;

/// An organization represents a tenant in the multi-tenant system.
///
/// Users can belong to multiple organizations with different roles.
/// Organizations are never deleted by the tenancy workflows.
///
/// # Examples
///
/// ```
/// use tenancy_org::Organization;
///
/// let org = Organization::new(1, "Acme Corp");
/// assert_eq!(org.name, "Acme Corp");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier for the organization
    pub id: OrganizationId,

    /// Human-readable name
    pub name: String,

    /// When the organization was created
    pub created_at: DateTime<Utc>,
}

impl Organization {
    /// Creates an organization value for an id assigned by the store.
    pub fn new(id: OrganizationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for Organization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
