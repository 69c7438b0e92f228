//! The store interface the migration pipeline depends on.

use async_trait::async_trait;
use idmigrate_gateway::OrganizationId;

use crate::{SourceLogin, SourceUser, StoreError};

/// Read and write access to the legacy user tables.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Users ordered by id ascending, skipping the first `offset` rows.
    /// An offset past the end yields an empty list.
    async fn fetch_users(&self, offset: u64) -> Result<Vec<SourceUser>, StoreError>;

    /// Every login whose `seller_id` is `user_id`.
    async fn fetch_logins_for_user(&self, user_id: i64) -> Result<Vec<SourceLogin>, StoreError>;

    /// Record the organization created for `user_id`.
    ///
    /// Calling this again with the same value succeeds. It never replaces a
    /// different organization id that is already stored.
    async fn persist_organization_id(
        &self,
        user_id: i64,
        organization: &OrganizationId,
    ) -> Result<(), StoreError>;

    /// Release any held connections.
    async fn close(&self) {}
}
