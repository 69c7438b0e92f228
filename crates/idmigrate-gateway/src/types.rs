//! Wire types for the Clerk Backend API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Password hasher Clerk should assume for imported digests.
pub const DEFAULT_PASSWORD_HASHER: &str = "bcrypt";

/// Identifier of an organization in the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(pub String);

impl OrganizationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a user account in the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityHandle(pub String);

impl IdentityHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role assigned to a user inside an organization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    Admin,
    #[default]
    BasicMember,
}

impl MembershipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Admin => "admin",
            MembershipRole::BasicMember => "basic_member",
        }
    }
}

/// A user account to create from an existing password digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_digest: &'a str,
    pub password_hasher: &'a str,
}

impl<'a> NewIdentity<'a> {
    /// Create a new identity request using the default (bcrypt) hasher.
    pub fn new(
        email: &'a str,
        first_name: &'a str,
        last_name: &'a str,
        password_digest: &'a str,
    ) -> Self {
        Self {
            email,
            first_name,
            last_name,
            password_digest,
            password_hasher: DEFAULT_PASSWORD_HASHER,
        }
    }
}

/// Request body for `POST /organizations`.
#[derive(Debug, Serialize)]
pub(crate) struct CreateOrganizationRequest<'a> {
    pub name: &'a str,
    pub created_by: &'a str,
}

/// Request body for `POST /users`.
#[derive(Debug, Serialize)]
pub(crate) struct CreateUserRequest<'a> {
    pub email_address: [&'a str; 1],
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_digest: &'a str,
    pub password_hasher: &'a str,
}

impl<'a> From<&NewIdentity<'a>> for CreateUserRequest<'a> {
    fn from(identity: &NewIdentity<'a>) -> Self {
        Self {
            email_address: [identity.email],
            first_name: identity.first_name,
            last_name: identity.last_name,
            password_digest: identity.password_digest,
            password_hasher: identity.password_hasher,
        }
    }
}

/// Request body for `POST /organizations/{id}/memberships`.
#[derive(Debug, Serialize)]
pub(crate) struct CreateMembershipRequest<'a> {
    pub user_id: &'a str,
    pub role: MembershipRole,
}

/// Any API object that carries an `id`.
#[derive(Debug, Deserialize)]
pub(crate) struct ObjectWithId {
    pub id: String,
}

/// Error response format (`{"errors": [...]}`).
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub message: String,
    #[serde(default)]
    pub long_message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}
