//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use idmigrate_gateway::{DEFAULT_CLERK_API_URL, KeyEnvironment};
use idmigrate_pipeline::PipelineSettings;
use thiserror::Error;

/// Parse boolean from environment variable, accepting common truthy values.
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Accepts "0", "false", "no", "off", "" (case-insensitive) as false.
pub fn parse_bool_env(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(format!(
            "invalid boolean value '{}', expected 1/true/yes/on or 0/false/no/off",
            s
        )),
    }
}

/// Errors in the startup configuration. No part of the run happens if any
/// of these is raised.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error(
        "CLERK_SECRET_KEY is not a production key; set ALLOW_NON_PRODUCTION=true to migrate into a development instance"
    )]
    NonProductionKey,
}

/// Migrate legacy users and logins into Clerk.
#[derive(Parser, Debug)]
#[command(name = "idmigrate")]
#[command(about = "Migrate legacy users and logins into Clerk organizations and accounts", long_about = None)]
pub struct Cli {
    /// Clerk secret key
    #[arg(long, env = "CLERK_SECRET_KEY", hide_env_values = true)]
    pub clerk_secret_key: String,

    /// Source database URL
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Pause after each login, in milliseconds
    #[arg(long, env = "INTER_LOGIN_DELAY_MS", default_value = "1000")]
    pub inter_login_delay_ms: u64,

    /// Pause before retrying a rate-limited user, in milliseconds
    #[arg(long, env = "RATE_LIMIT_RETRY_DELAY_MS", default_value = "10000")]
    pub rate_limit_retry_delay_ms: u64,

    /// Allow a development (sk_test_) key.
    /// Accepts "1", "true", "yes", or "on".
    #[arg(long, env = "ALLOW_NON_PRODUCTION", value_parser = parse_bool_env, default_value = "false")]
    pub allow_non_production: bool,

    /// Number of users (ordered by id) to skip, to resume an earlier run
    #[arg(long, env = "RESUME_OFFSET", default_value = "0")]
    pub resume_offset: u64,

    /// Clerk Backend API base URL
    #[arg(long, env = "CLERK_API_URL", default_value = DEFAULT_CLERK_API_URL)]
    pub clerk_api_url: String,

    /// Directory for the run log
    #[arg(long, env = "MIGRATION_LOG_DIR", default_value = ".")]
    pub log_dir: PathBuf,

    /// Give up on a user after this many rate-limit restarts (default: never)
    #[arg(long, env = "MAX_RATE_LIMIT_RESTARTS")]
    pub max_rate_limit_restarts: Option<u32>,

    /// Source database pool size
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value = "5")]
    pub max_connections: u32,

    /// Preview changes without applying (dry-run)
    #[arg(long)]
    pub dry_run: bool,
}

/// Validated configuration for a run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub clerk_secret_key: String,
    pub clerk_api_url: String,
    pub database_url: String,
    pub max_connections: u32,
    pub log_dir: PathBuf,
    pub dry_run: bool,
    pub pipeline: PipelineSettings,
}

impl MigrationConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let clerk_secret_key = cli.clerk_secret_key.trim().to_string();
        if clerk_secret_key.is_empty() {
            return Err(ConfigError::Missing("CLERK_SECRET_KEY"));
        }
        let database_url = cli.database_url.trim().to_string();
        if database_url.is_empty() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        match KeyEnvironment::of_secret_key(&clerk_secret_key) {
            Some(KeyEnvironment::Production) => {}
            Some(KeyEnvironment::Development) if cli.allow_non_production => {}
            Some(KeyEnvironment::Development) => return Err(ConfigError::NonProductionKey),
            None => {
                return Err(ConfigError::Invalid {
                    name: "CLERK_SECRET_KEY",
                    reason: "expected a key starting with sk_live_ or sk_test_".to_string(),
                });
            }
        }

        if cli.max_connections == 0 {
            return Err(ConfigError::Invalid {
                name: "DATABASE_MAX_CONNECTIONS",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            clerk_secret_key,
            clerk_api_url: cli.clerk_api_url,
            database_url,
            max_connections: cli.max_connections,
            log_dir: cli.log_dir,
            dry_run: cli.dry_run,
            pipeline: PipelineSettings {
                inter_login_delay: Duration::from_millis(cli.inter_login_delay_ms),
                rate_limit_retry_delay: Duration::from_millis(cli.rate_limit_retry_delay_ms),
                resume_offset: cli.resume_offset,
                max_rate_limit_restarts: cli.max_rate_limit_restarts,
                ..PipelineSettings::default()
            },
        })
    }
}
