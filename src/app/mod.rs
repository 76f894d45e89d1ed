//! Binary orchestration: configuration, database start-up and subcommand
//! dispatch.
//!
//! The `gazette` binary stays a thin wrapper around [`run`].

pub mod admin;
pub mod config;

use anyhow::{Context as _, Result};
use clap::Parser;
pub use cli_defs::{AppConfig, Cli, Commands};
use tracing::info;

pub use self::{
    admin::run_command,
    config::{build_context, load_config, validate_config},
};
use crate::db::{DbConnection, DbPool, apply_migrations, establish_pool};

/// Parse CLI arguments and execute the requested command.
///
/// # Errors
///
/// Returns any error emitted while loading configuration, preparing the
/// database or running the command.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli).await
}

/// Build a connection pool for the configured database, apply pending
/// migrations and audit the backend.
///
/// # Errors
///
/// Returns an error when the database cannot be reached, migrated or does
/// not provide the required features.
pub async fn open_database(cfg: &AppConfig) -> Result<DbPool> {
    let pool = establish_pool(&cfg.database)
        .await
        .with_context(|| format!("failed to open database {:?}", cfg.database))?;
    let mut conn = pool.get().await.context("failed to get db connection")?;
    apply_migrations(&mut conn, &cfg.database)
        .await
        .context("failed to apply migrations")?;
    audit(&mut conn).await?;
    drop(conn);
    Ok(pool)
}

cfg_if::cfg_if! {
    if #[cfg(feature = "postgres")] {
        async fn audit(conn: &mut DbConnection) -> Result<()> {
            crate::db::audit_postgres_features(conn)
                .await
                .context("postgres feature audit failed")
        }
    } else {
        async fn audit(conn: &mut DbConnection) -> Result<()> {
            crate::db::audit_sqlite_features(conn)
                .await
                .context("sqlite feature audit failed")
        }
    }
}

/// Execute using an already parsed [`Cli`].
///
/// # Errors
///
/// See [`run`].
pub async fn run_with_cli(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    let pool = open_database(&cfg).await?;
    let mut conn = pool.get().await.context("failed to get db connection")?;
    match cli.command {
        Some(command) => run_command(command, &cfg, &mut conn).await,
        None => {
            info!(database = %cfg.database, "database migrated; gazette is ready");
            Ok(())
        }
    }
}
