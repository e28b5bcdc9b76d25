use sqlx::migrate::{Migrate, Migrator};
use sqlx::PgConnection;

use crate::error::MigrationError;

/// Ledger table maintained by `sqlx::migrate`.
pub const LEDGER_TABLE: &str = "_sqlx_migrations";

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Create the tenant schema if needed and point the session at it, so both the
/// scripts and the ledger land inside the schema.
pub async fn prepare_schema(conn: &mut PgConnection, schema: &str) -> Result<(), sqlx::Error> {
    let schema = quote_ident(schema);

    let create = format!("CREATE SCHEMA IF NOT EXISTS {schema}");
    sqlx::query(&create).execute(&mut *conn).await?;
    let search_path = format!("SET search_path TO {schema}");
    sqlx::query(&search_path).execute(&mut *conn).await?;

    Ok(())
}

/// Baseline-on-migrate: a schema that already holds tables but has no ledger
/// gets a ledger in which every script up to `baseline_version` is recorded as
/// applied without running it. Returns the number of entries recorded.
pub async fn baseline_if_needed(
    conn: &mut PgConnection,
    schema: &str,
    migrator: &Migrator,
    baseline_version: i64,
) -> Result<usize, MigrationError> {
    let has_ledger: bool = sqlx::query_scalar(
        "SELECT EXISTS (
           SELECT 1 FROM information_schema.tables
           WHERE table_schema = $1 AND table_name = $2
         )",
    )
    .bind(schema)
    .bind(LEDGER_TABLE)
    .fetch_one(&mut *conn)
    .await?;

    if has_ledger {
        return Ok(0);
    }

    let has_objects: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = $1)",
    )
    .bind(schema)
    .fetch_one(&mut *conn)
    .await?;

    if !has_objects {
        return Ok(0);
    }

    tracing::warn!(
        "Schema {schema} has objects but no migration ledger, baselining at version {baseline_version}"
    );
    conn.ensure_migrations_table().await?;

    let baseline: Vec<(i64, String, Vec<u8>)> = migrator
        .iter()
        .filter(|m| m.version <= baseline_version && !m.migration_type.is_down_migration())
        .map(|m| (m.version, m.description.to_string(), m.checksum.to_vec()))
        .collect();

    for (version, description, checksum) in &baseline {
        sqlx::query(
            "INSERT INTO _sqlx_migrations (version, description, success, checksum, execution_time)
             VALUES ($1, $2, TRUE, $3, 0)",
        )
        .bind(version)
        .bind(description)
        .bind(checksum)
        .execute(&mut *conn)
        .await?;
    }

    Ok(baseline.len())
}
