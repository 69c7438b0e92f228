//! Wiring for a migration run: connect, run (or preview), report.

use idmigrate_gateway::ClerkClient;
use idmigrate_pipeline::{Pipeline, RunContext};
use idmigrate_store::{PgSourceStore, SourceStore};
use miette::Result;
use tracing::{error, info};

use crate::config::MigrationConfig;

/// Run the migration described by `config`.
///
/// The database pool is always closed before this returns, whether the run
/// succeeded or not.
pub async fn run(config: MigrationConfig) -> Result<()> {
    let gateway = ClerkClient::new(&config.clerk_api_url, &config.clerk_secret_key)
        .map_err(|e| miette::miette!("failed to create Clerk client: {}", e))?;

    let store = PgSourceStore::connect(&config.database_url, config.max_connections)
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    let pipeline = Pipeline::new(store, gateway, config.pipeline.clone());

    let result = if config.dry_run {
        preview(&pipeline).await
    } else {
        migrate(&pipeline, &config).await
    };

    pipeline.store().close().await;
    result
}

async fn preview(pipeline: &Pipeline<PgSourceStore, ClerkClient>) -> Result<()> {
    let preview = pipeline
        .preview()
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    println!(
        "Dry-run: {} user(s), {} organization(s) would be created, {} login(s) would be attempted",
        preview.users, preview.organizations_to_create, preview.logins_to_attempt
    );
    if !preview.changes.is_empty() {
        println!("\nChanges:");
        for change in &preview.changes {
            println!("  - {}", change);
        }
    }
    Ok(())
}

async fn migrate(
    pipeline: &Pipeline<PgSourceStore, ClerkClient>,
    config: &MigrationConfig,
) -> Result<()> {
    let mut ctx = RunContext::start(&config.log_dir)
        .map_err(|e| miette::miette!("failed to open run log: {}", e))?;
    info!(
        log = %ctx.log_path().display(),
        started_at = %ctx.started_at(),
        resume_offset = config.pipeline.resume_offset,
        "starting migration"
    );

    match pipeline.run(&mut ctx).await {
        Ok(summary) => {
            println!("{}", summary);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, log = %ctx.log_path().display(), "migration aborted");
            Err(miette::miette!("migration aborted: {}", e))
        }
    }
}
