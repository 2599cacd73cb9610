//! Schema migration runner for the ledger's meta schema.
//!
//! Tracks applied migration versions in `<meta_schema>.schema_version` and
//! runs any unapplied migrations on each open.

use crate::ddl::MIGRATIONS;
use crate::error::{LedgerError, LedgerResult};
use dw_core::sql_utils::quote_ident;
use dw_db::Database;

/// Ensure the meta schema and the `schema_version` table exist.
async fn ensure_version_table(db: &dyn Database, meta_schema: &str) -> LedgerResult<()> {
    db.create_schema_if_not_exists(meta_schema)
        .await
        .map_err(|e| LedgerError::MigrationError(format!("failed to create meta schema: {}", e)))?;
    db.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {}.schema_version (
             version    INTEGER NOT NULL,
             applied_at TIMESTAMP NOT NULL DEFAULT now()
         )",
        quote_ident(meta_schema)
    ))
    .await
    .map_err(|e| {
        LedgerError::MigrationError(format!("failed to create schema_version table: {}", e))
    })?;
    Ok(())
}

/// Return the highest applied migration version, or 0 if none.
async fn current_version(db: &dyn Database, meta_schema: &str) -> LedgerResult<i32> {
    let version = db
        .query_i64(&format!(
            "SELECT COALESCE(MAX(version), 0) FROM {}.schema_version",
            quote_ident(meta_schema)
        ))
        .await
        .map_err(|e| LedgerError::MigrationError(format!("failed to read schema version: {}", e)))?;
    Ok(version as i32)
}

/// Run all unapplied migrations against `db`.
///
/// Runs once per deployment at ledger open, before any script transaction
/// starts. The version number is recorded in `schema_version` after
/// successful execution.
pub async fn run_migrations(db: &dyn Database, meta_schema: &str) -> LedgerResult<()> {
    ensure_version_table(db, meta_schema).await?;
    let current = current_version(db, meta_schema).await?;

    for migration in MIGRATIONS {
        if migration.version <= current {
            continue;
        }
        log::debug!("Applying ledger migration v{:03}", migration.version);

        db.execute_batch(&migration.render(meta_schema))
            .await
            .map_err(|e| {
                LedgerError::MigrationError(format!(
                    "migration v{:03} failed: {}",
                    migration.version, e
                ))
            })?;

        db.execute(&format!(
            "INSERT INTO {}.schema_version (version) VALUES ({})",
            quote_ident(meta_schema),
            migration.version
        ))
        .await
        .map_err(|e| {
            LedgerError::MigrationError(format!(
                "failed to record migration v{:03}: {}",
                migration.version, e
            ))
        })?;
    }
    Ok(())
}
