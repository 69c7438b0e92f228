//! Error types for the source store.

use thiserror::Error;

/// Errors that can occur when reading or updating the source store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection could not be established or a query failed.
    #[error("source store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    /// The user is already bound to a different organization.
    #[error("user {user_id} is already bound to another organization")]
    OrganizationAlreadyAssigned { user_id: i64 },

    /// The user row disappeared before its organization could be recorded.
    #[error("user {user_id} not found in source store")]
    UserNotFound { user_id: i64 },
}
