//! Museum CMS back office
//!
//! Entry point with configuration loading, database migrations, scheduler
//! startup and the administrative console commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cms_auth::{Identity, Role};
use serde_json::Value;

use cms_backend::config_helpers::{database_config_from_config, dump_client_from_config};
use cms_backend::{admin, AdminError, AppState, Caller};

mod cli;
mod tracing_setup;

use cli::{BackupCommand, CliArgs, Command, JobsCommand};
use tracing_setup::install_tracing_from_config;

/// Identity console commands run as; recorded in the operation log.
const CONSOLE_ADMIN_ID: i64 = 0;
const CONSOLE_ADMIN_NAME: &str = "console";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config_path, command) = CliArgs::parse().into_parts();

    // Resolve config path: CLI > environment variable
    let config_path = config_path.or_else(|| std::env::var_os("CMS_CONFIG_PATH").map(PathBuf::from));
    let config = load_config(config_path.as_deref())?;

    install_tracing_from_config(&config.logging);
    tracing::info!(config_path = ?config_path, "configuration loaded");

    let state = build_state(config).await?;

    match command {
        Command::Serve => serve(state).await,
        Command::Backup(cmd) => run_backup_command(&state, cmd).await,
        Command::Jobs(cmd) => run_jobs_command(&state, cmd).await,
    }
}

/// Load and validate configuration from file or defaults.
fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<cms_config::Config> {
    let config = cms_config::load_config(path).context("failed to load configuration")?;
    cms_config::validate_config(&config).context("invalid configuration")?;
    Ok(config)
}

/// Create the pool, apply migrations and assemble the shared services.
async fn build_state(config: cms_config::Config) -> anyhow::Result<AppState> {
    let db_cfg = database_config_from_config(&config)?;
    let db_pool = cms_db::create_pool(&db_cfg)
        .await
        .context("failed to create database pool")?;
    run_migrations(&db_pool).await?;

    tracing::info!(
        db_max_connections = db_cfg.max_connections,
        backup_dir = %config.backups.directory,
        retention_days = config.backups.retention_days,
        "database and backup configuration"
    );

    let dumper = Arc::new(dump_client_from_config(&config));
    let state = AppState::new(db_pool, dumper, config);
    state
        .register_jobs()
        .await
        .context("failed to register recurring jobs")?;
    Ok(state)
}

async fn run_migrations(db_pool: &cms_db::DbPool) -> anyhow::Result<()> {
    #[cfg(feature = "mysql")]
    let migrator = cms_migrations::mysql_migrator();
    #[cfg(feature = "sqlite")]
    let migrator = cms_migrations::sqlite_migrator();

    tracing::info!(backend = cms_db::BACKEND_NAME, "applying database migrations");
    match migrator.run(db_pool).await {
        Ok(()) => {
            tracing::info!("database migrations applied successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!(%e, "failed to apply database migrations");
            Err(anyhow::anyhow!("failed to apply database migrations: {e}"))
        }
    }
}

/// Run the scheduler until ctrl-c, then wait for in-flight jobs.
async fn serve(state: AppState) -> anyhow::Result<()> {
    if state.config().scheduler.enabled {
        state.scheduler.start().await;
    } else {
        tracing::warn!("scheduler disabled by configuration; no recurring jobs will run");
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested");

    state.scheduler.stop().await;
    state.db_pool.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn run_backup_command(state: &AppState, cmd: BackupCommand) -> anyhow::Result<()> {
    let identity = console_identity();
    let caller = Caller::new(Some(&identity));
    let result = match cmd {
        BackupCommand::List { page, per_page } => {
            admin::list_backups(state, caller, page, per_page).await
        }
        BackupCommand::Create { description } => {
            admin::create_backup(state, caller, &description).await
        }
        BackupCommand::Restore { id } => admin::restore_backup(state, caller, id).await,
        BackupCommand::Delete { id } => admin::delete_backup(state, caller, id).await,
    };
    print_result(result)
}

async fn run_jobs_command(state: &AppState, cmd: JobsCommand) -> anyhow::Result<()> {
    let identity = console_identity();
    let caller = Caller::new(Some(&identity));
    let result = match cmd {
        JobsCommand::List => admin::list_jobs(state, caller).await,
        JobsCommand::Run { name } => admin::run_job(state, caller, &name).await,
    };
    print_result(result)
}

fn console_identity() -> Identity {
    Identity::new(CONSOLE_ADMIN_ID, CONSOLE_ADMIN_NAME, Role::SuperAdmin)
}

fn print_result(result: Result<Value, AdminError>) -> anyhow::Result<()> {
    match result {
        Ok(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&e.to_json())?);
            Err(e.into())
        }
    }
}
