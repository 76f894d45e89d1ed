//! Backend capability audits run before the schema is touched.

use diesel::{QueryableByName, result::QueryResult, sql_query};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;

/// Verify that `SQLite` understands the constructs the schema relies on.
///
/// The rubric table references itself and every child table carries foreign
/// keys, so the `foreign_keys` pragma must be recognised, and newly inserted
/// ids are read back through `RETURNING`, which needs `SQLite` 3.35.
///
/// # Errors
/// Returns any error produced by the probe queries, or a query builder error
/// when the library version is too old.
#[cfg(feature = "sqlite")]
#[must_use = "handle the result"]
pub async fn audit_sqlite_features(conn: &mut DbConnection) -> QueryResult<()> {
    use diesel::{result::Error as DieselError, sql_types::Text};

    #[derive(QueryableByName)]
    struct SqliteVersion {
        #[diesel(sql_type = Text)]
        version: String,
    }

    sql_query("PRAGMA foreign_keys").execute(conn).await?;

    let row: SqliteVersion = sql_query("SELECT sqlite_version() AS version")
        .get_result(conn)
        .await?;
    let mut parts = row.version.split('.').map(str::parse::<u32>);
    let (Some(Ok(major)), Some(Ok(minor))) = (parts.next(), parts.next()) else {
        return Err(DieselError::QueryBuilderError(Box::new(std::io::Error::other(
            format!("unable to parse sqlite version: {}", row.version),
        ))));
    };
    if (major, minor) < (3, 35) {
        return Err(DieselError::QueryBuilderError(Box::new(std::io::Error::other(
            format!("sqlite {} lacks RETURNING support (require >= 3.35)", row.version),
        ))));
    }
    Ok(())
}

/// Verify that the Postgres server meets application requirements.
///
/// # Errors
/// Returns any error produced by the version query or if the version string
/// cannot be parsed or is older than 14.
#[cfg(feature = "postgres")]
#[must_use = "handle the result"]
pub async fn audit_postgres_features(conn: &mut DbConnection) -> QueryResult<()> {
    use diesel::{result::Error as DieselError, sql_types::Text};

    #[derive(QueryableByName)]
    struct PgVersion {
        #[diesel(sql_type = Text)]
        version: String,
    }

    let row: PgVersion = sql_query("SELECT version()").get_result(conn).await?;

    let major = row
        .version
        .split_whitespace()
        .nth(1)
        .and_then(|v| v.split('.').next())
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| {
            DieselError::QueryBuilderError(Box::new(std::io::Error::other(format!(
                "unable to parse postgres version: {}",
                row.version
            ))))
        })?;

    if major < 14 {
        return Err(DieselError::QueryBuilderError(Box::new(
            std::io::Error::other(format!(
                "postgres version {major} is not supported (require >= 14)"
            )),
        )));
    }

    Ok(())
}
