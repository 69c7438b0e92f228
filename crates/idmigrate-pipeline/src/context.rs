//! Run-scoped state: counters and the log sink.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::{LogEntry, LogSink, LogSinkError};

/// Counters for one run. Nothing here is persisted across runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Logins created with their membership.
    pub migrated: u64,
    /// Logins the identity service already knew about.
    pub already_exists: u64,
    pub logins_failed: u64,
    pub organizations_created: u64,
    pub users_processed: u64,
    pub users_failed: u64,
    pub rate_limit_restarts: u64,
}

/// Everything the pipeline mutates during a run.
pub struct RunContext {
    pub counters: RunCounters,
    log: LogSink,
    started_at: DateTime<Utc>,
}

impl RunContext {
    /// Start a run now, logging to a fresh file in `log_dir`.
    pub fn start(log_dir: impl AsRef<Path>) -> Result<Self, LogSinkError> {
        let started_at = Utc::now();
        let log = LogSink::create(log_dir, started_at)?;
        Ok(Self::new(log, started_at))
    }

    pub fn new(log: LogSink, started_at: DateTime<Utc>) -> Self {
        Self {
            counters: RunCounters::default(),
            log,
            started_at,
        }
    }

    /// Append to the run log.
    pub fn log(&mut self, entry: LogEntry) -> Result<(), LogSinkError> {
        self.log.append(&entry)
    }

    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Snapshot the run for reporting.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            counters: self.counters,
            started_at: self.started_at,
            finished_at: Utc::now(),
            log_path: self.log.path().to_path_buf(),
            log_entries: self.log.entries_written(),
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub counters: RunCounters,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub log_path: PathBuf,
    pub log_entries: usize,
}

impl RunSummary {
    pub fn duration_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counters;
        writeln!(f, "Migration complete in {:.1}s", self.duration_seconds())?;
        writeln!(f, "  Migrated logins:        {}", c.migrated)?;
        writeln!(f, "  Already existing:       {}", c.already_exists)?;
        writeln!(f, "  Failed logins:          {}", c.logins_failed)?;
        writeln!(f, "  Organizations created:  {}", c.organizations_created)?;
        writeln!(
            f,
            "  Users processed:        {} ({} failed)",
            c.users_processed, c.users_failed
        )?;
        writeln!(f, "  Rate limit restarts:    {}", c.rate_limit_restarts)?;
        write!(
            f,
            "  Log: {} ({} entries)",
            self.log_path.display(),
            self.log_entries
        )
    }
}
