//! Source store accessor for idmigrate.
//!
//! Reads the legacy `users` and `logins` tables and writes back the
//! organization id assigned to each user. The writeback is an idempotent
//! `UPDATE`, never an insert, so re-running a migration is always safe.

mod error;
mod models;
mod postgres;
mod store;

pub use error::StoreError;
pub use models::{SourceLogin, SourceUser};
pub use postgres::PgSourceStore;
pub use store::SourceStore;
