//! idmigrate: move legacy sellers and their logins into Clerk.
//!
//! Every row of `users` becomes a Clerk organization and every row of
//! `logins` becomes a Clerk user in its seller's organization. Progress is
//! written back to `users.clerk_organization_id` and to a per-run JSON log,
//! so an interrupted run can simply be started again (optionally with
//! `--resume-offset` to skip users that are already done).

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod migrate;

use config::{Cli, MigrationConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Values from .env only fill in variables that are not already set
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "idmigrate=info,idmigrate_pipeline=info,idmigrate_store=info,idmigrate_gateway=warn"
                    .to_string()
            }),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = MigrationConfig::from_cli(cli).map_err(|e| miette::miette!("{}", e))?;

    migrate::run(config).await
}
