//! Error types for the migration pipeline.

use idmigrate_store::StoreError;
use thiserror::Error;

use crate::LogSinkError;

/// Errors that abort a whole run.
///
/// Everything else (gateway failures, duplicates, rate limits) is handled per
/// user or per login and never reaches the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source store could not be read or updated.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The run log could not be written.
    #[error("log sink error: {0}")]
    LogSink(#[from] LogSinkError),
}
