//! PostgreSQL implementation of [`SourceStore`].

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use idmigrate_gateway::OrganizationId;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::{SourceLogin, SourceStore, SourceUser, StoreError};

const SELECT_USERS: &str = "
    SELECT id::bigint AS id, email, first_name, last_name, password, company,
           clerk_organization_id
    FROM users
    ORDER BY id ASC
    OFFSET $1";

const SELECT_LOGINS_FOR_USER: &str = "
    SELECT id::bigint AS id, email, first_name, last_name, password,
           seller_id::bigint AS seller_id
    FROM logins
    WHERE seller_id = $1
    ORDER BY id ASC";

// An empty string reads as unassigned, so it must be writable too. Matching
// rows that already hold the same id keeps the update idempotent; a different
// id is never replaced.
const UPDATE_ORGANIZATION_ID: &str = "
    UPDATE users
    SET clerk_organization_id = $2
    WHERE id = $1
      AND (clerk_organization_id IS NULL
           OR clerk_organization_id = ''
           OR clerk_organization_id = $2)";

const USER_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)";

/// Source store backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgSourceStore {
    pool: PgPool,
}

impl PgSourceStore {
    /// Connect to the database at `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = PgConnectOptions::from_str(url)?;
        Self::connect_with(options, max_connections).await
    }

    /// Connect with explicit connection options.
    pub async fn connect_with(
        options: PgConnectOptions,
        max_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        info!(max_connections, "connected to source database");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn user_from_row(row: &PgRow) -> Result<SourceUser, StoreError> {
        Ok(SourceUser {
            id: row.try_get("id")?,
            email: text_or_empty(row, "email")?,
            first_name: text_or_empty(row, "first_name")?,
            last_name: text_or_empty(row, "last_name")?,
            password: text_or_empty(row, "password")?,
            company: text_or_empty(row, "company")?,
            organization_id: row
                .try_get::<Option<String>, _>("clerk_organization_id")?
                .filter(|id| !id.is_empty())
                .map(OrganizationId),
        })
    }

    fn login_from_row(row: &PgRow) -> Result<SourceLogin, StoreError> {
        Ok(SourceLogin {
            id: row.try_get("id")?,
            email: text_or_empty(row, "email")?,
            first_name: text_or_empty(row, "first_name")?,
            last_name: text_or_empty(row, "last_name")?,
            password: text_or_empty(row, "password")?,
            seller_id: row.try_get("seller_id")?,
        })
    }
}

/// Nullable text columns are read as empty strings.
fn text_or_empty(row: &PgRow, column: &str) -> Result<String, sqlx::Error> {
    Ok(row
        .try_get::<Option<String>, _>(column)?
        .unwrap_or_default())
}

#[async_trait]
impl SourceStore for PgSourceStore {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn fetch_users(&self, offset: u64) -> Result<Vec<SourceUser>, StoreError> {
        // OFFSET takes a bigint; clamp rather than wrap for absurd offsets
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let rows = sqlx::query(SELECT_USERS)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let users = rows
            .iter()
            .map(Self::user_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(offset, count = users.len(), "fetched users");
        Ok(users)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn fetch_logins_for_user(&self, user_id: i64) -> Result<Vec<SourceLogin>, StoreError> {
        let rows = sqlx::query(SELECT_LOGINS_FOR_USER)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::login_from_row).collect()
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn persist_organization_id(
        &self,
        user_id: i64,
        organization: &OrganizationId,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(UPDATE_ORGANIZATION_ID)
            .bind(user_id)
            .bind(organization.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let exists: bool = sqlx::query_scalar(USER_EXISTS)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        if exists {
            Err(StoreError::OrganizationAlreadyAssigned { user_id })
        } else {
            Err(StoreError::UserNotFound { user_id })
        }
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!("closed source database pool");
    }
}
