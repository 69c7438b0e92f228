//! Row types for the legacy tables.

use idmigrate_gateway::{NewIdentity, OrganizationId};

/// A row of the `users` table: one seller account, migrated as an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUser {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub company: String,
    /// Set once the organization has been created and written back.
    pub organization_id: Option<OrganizationId>,
}

impl SourceUser {
    pub fn has_organization(&self) -> bool {
        self.organization_id.is_some()
    }
}

/// A row of the `logins` table: one account under a seller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLogin {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// bcrypt digest.
    pub password: String,
    pub seller_id: i64,
}

impl SourceLogin {
    /// The account creation request for this login.
    pub fn as_new_identity(&self) -> NewIdentity<'_> {
        NewIdentity::new(
            &self.email,
            &self.first_name,
            &self.last_name,
            &self.password,
        )
    }
}
