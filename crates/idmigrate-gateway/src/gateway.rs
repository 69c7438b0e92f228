//! The capability surface the migration pipeline depends on.

use async_trait::async_trait;

use crate::{GatewayError, IdentityHandle, MembershipRole, NewIdentity, OrganizationId};

/// Operations the migration performs against the identity service.
///
/// Implementations translate provider responses into [`GatewayError`] so that
/// callers can branch on [`GatewayError::kind`] alone. None of these calls
/// are transactional: an organization or identity that was created stays
/// created even if a later call for the same record fails.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Create an organization. Fails with `RateLimited` or `Fatal`.
    async fn create_organization(
        &self,
        name: &str,
        created_by: &str,
    ) -> Result<OrganizationId, GatewayError>;

    /// Create a user account. Fails with `Conflict` when the identity
    /// already exists, otherwise `RateLimited` or `Fatal`.
    async fn create_identity(
        &self,
        identity: &NewIdentity<'_>,
    ) -> Result<IdentityHandle, GatewayError>;

    /// Add a user to an organization with the given role.
    async fn create_membership(
        &self,
        organization: &OrganizationId,
        identity: &IdentityHandle,
        role: MembershipRole,
    ) -> Result<(), GatewayError>;
}
