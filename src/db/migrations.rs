//! Embedded schema migrations.

use std::{error::Error as StdError, time::Duration};

use cfg_if::cfg_if;
use diesel::result::{Error as DieselError, QueryResult};
use diesel_migrations::MigrationHarness;
use thiserror::Error;
use tokio::time::timeout;
use tracing::info;

use super::connection::{DbConnection, MIGRATIONS};

/// Upper bound on how long applying the embedded migrations may take.
const MIGRATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Failures raised while applying migrations, carried inside
/// [`DieselError::SerializationError`] so callers keep a single error type.
#[derive(Debug, Error)]
enum MigrationFailure {
    #[error("migration harness error: {0}")]
    Harness(Box<dyn StdError + Send + Sync>),
    #[error("migrations did not finish within {0:?}")]
    TimedOut(Duration),
    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    #[error("migration worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    #[error("migration connection failed: {0}")]
    Connect(#[from] diesel::result::ConnectionError),
}

impl From<MigrationFailure> for DieselError {
    fn from(value: MigrationFailure) -> Self { Self::SerializationError(Box::new(value)) }
}

fn run_pending<C>(conn: &mut C) -> QueryResult<()>
where
    C: MigrationHarness<super::connection::Backend>,
{
    if let Ok(false) = conn.has_pending_migration(MIGRATIONS) {
        info!("schema up to date; no migrations applied");
        return Ok(());
    }
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(MigrationFailure::Harness)?;
    info!(count = applied.len(), "applied pending migrations");
    Ok(())
}

cfg_if! {
    if #[cfg(feature = "sqlite")] {
        /// Run the embedded migrations on an open connection.
        ///
        /// # Errors
        /// Returns any error produced by Diesel while running migrations, or a
        /// serialization error wrapping a timeout.
        #[must_use = "handle the result"]
        pub async fn run_migrations(conn: &mut DbConnection) -> QueryResult<()> {
            timeout(MIGRATION_TIMEOUT, conn.spawn_blocking(|c| run_pending(c)))
                .await
                .map_err(|_| MigrationFailure::TimedOut(MIGRATION_TIMEOUT))??;
            Ok(())
        }

        /// Apply embedded migrations for the current backend.
        ///
        /// # Errors
        /// Returns any error produced by Diesel while running migrations.
        #[must_use = "handle the result"]
        pub async fn apply_migrations(conn: &mut DbConnection, _database_url: &str) -> QueryResult<()> {
            run_migrations(conn).await
        }
    } else if #[cfg(all(feature = "postgres", not(feature = "sqlite")))] {
        /// Run the embedded migrations over a dedicated blocking connection.
        ///
        /// # Errors
        /// Returns any error produced by Diesel while running migrations, or a
        /// serialization error wrapping a timeout or connection failure.
        #[must_use = "handle the result"]
        pub async fn run_migrations(database_url: &str) -> QueryResult<()> {
            use diesel::{Connection, pg::PgConnection};
            let url = database_url.to_owned();
            timeout(
                MIGRATION_TIMEOUT,
                tokio::task::spawn_blocking(move || -> QueryResult<()> {
                    let mut conn = PgConnection::establish(&url).map_err(MigrationFailure::from)?;
                    run_pending(&mut conn)
                }),
            )
            .await
            .map_err(|_| MigrationFailure::TimedOut(MIGRATION_TIMEOUT))?
            .map_err(MigrationFailure::from)??;
            Ok(())
        }

        /// Apply embedded migrations for the current backend.
        ///
        /// # Errors
        /// Returns any error produced by Diesel while running migrations.
        #[must_use = "handle the result"]
        pub async fn apply_migrations(_conn: &mut DbConnection, url: &str) -> QueryResult<()> {
            run_migrations(url).await
        }
    }
}
