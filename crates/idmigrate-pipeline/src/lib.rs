//! Migration pipeline for idmigrate.
//!
//! This crate drives the per-user state machine:
//!
//! ```text
//! START -> ENSURE_ORG -> LOAD_LOGINS -> {PROCESS_LOGIN}* -> DONE
//!              ^                              |
//!              +------ RATE_LIMITED <---------+
//! ```
//!
//! - **Pipeline**: sequential, paced processing of users and their logins
//! - **Log sink**: append-only JSON record of everything that needs a human
//! - **Run context**: counters and the log sink for one invocation

mod context;
mod error;
pub mod log_sink;
mod pipeline;

pub use context::{RunContext, RunCounters, RunSummary};
pub use error::PipelineError;
pub use log_sink::{LogEntry, LogSink, LogSinkError};
pub use pipeline::{LoginOutcome, MigrationPreview, Pipeline, PipelineSettings, UserOutcome};
