//! Append-only run log.
//!
//! Each run writes `migration-log-<start>.json` where `<start>` is the run
//! start time truncated to whole seconds. Entries are pretty-printed JSON
//! objects, each preceded by a newline, so the file can be appended to
//! without rewriting. It is not a single JSON document; use
//! [`LogSink::read_entries`] to parse it back.

use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur writing or reading the run log.
#[derive(Debug, Error)]
pub enum LogSinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One record in the run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_id: Option<i64>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogEntry {
    /// An entry about a source user.
    pub fn user(user_id: i64, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            user_id: Some(user_id),
            login_id: None,
            message: message.into(),
            error: None,
        }
    }

    /// An entry about a source login.
    pub fn login(login_id: i64, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            user_id: None,
            login_id: Some(login_id),
            message: message.into(),
            error: None,
        }
    }

    /// Attach the error that caused this entry.
    pub fn with_error(mut self, error: impl Display) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Durable, append-only writer for one run's log file.
pub struct LogSink {
    file: File,
    path: PathBuf,
    entries_written: usize,
}

impl LogSink {
    /// File name for a run started at `started_at`.
    pub fn file_name(started_at: DateTime<Utc>) -> String {
        format!(
            "migration-log-{}.json",
            started_at.format("%Y-%m-%dT%H:%M:%S")
        )
    }

    /// Open (or create) the log for a run in `dir`. Existing content is kept.
    pub fn create(dir: impl AsRef<Path>, started_at: DateTime<Utc>) -> Result<Self, LogSinkError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let path = dir.join(Self::file_name(started_at));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), "opened run log");

        Ok(Self {
            file,
            path,
            entries_written: 0,
        })
    }

    /// Append an entry. The data is synced to disk before this returns.
    pub fn append(&mut self, entry: &LogEntry) -> Result<(), LogSinkError> {
        let mut chunk = String::from("\n");
        chunk.push_str(&serde_json::to_string_pretty(entry)?);

        self.file.write_all(chunk.as_bytes())?;
        self.file.sync_data()?;
        self.entries_written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries appended by this sink.
    pub fn entries_written(&self) -> usize {
        self.entries_written
    }

    /// Parse a log file written by [`LogSink`].
    pub fn read_entries(path: impl AsRef<Path>) -> Result<Vec<LogEntry>, LogSinkError> {
        let text = std::fs::read_to_string(path)?;
        serde_json::Deserializer::from_str(&text)
            .into_iter::<LogEntry>()
            .map(|entry| entry.map_err(LogSinkError::from))
            .collect()
    }
}
