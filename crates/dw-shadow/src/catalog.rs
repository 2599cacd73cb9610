//! Shadow catalog bootstrap and access.
//!
//! The catalog is a small table inside the shadow schema recording, for each
//! (module, entity) pair, which column establishes row identity. It persists
//! across deployments so that a later version's `restore_on_create` or
//! `apply` can reconcile rows for an entity whose key was declared versions
//! ago. Everything under the shadow schema, catalog included, is fair game
//! for the out-of-band purge utility.

use crate::error::ShadowResult;
use dw_core::sql_utils::{escape_sql_string, qualify, quote_ident};
use dw_db::Database;
use std::sync::Arc;

/// Name of the catalog table inside the shadow schema.
pub const CATALOG_TABLE: &str = "shadow_catalog";

/// Access to the shadow catalog table.
#[derive(Clone)]
pub struct ShadowCatalog {
    db: Arc<dyn Database>,
    schema: String,
}

impl ShadowCatalog {
    /// Create a catalog handle for the given shadow schema.
    pub fn new(db: Arc<dyn Database>, schema: impl Into<String>) -> Self {
        Self {
            db,
            schema: schema.into(),
        }
    }

    /// Ensure the shadow schema and the catalog table exist.
    pub async fn ensure(&self) -> ShadowResult<()> {
        self.db.create_schema_if_not_exists(&self.schema).await?;
        self.db
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} (
                     module VARCHAR NOT NULL,
                     entity VARCHAR NOT NULL,
                     key_column VARCHAR NOT NULL,
                     registered_at TIMESTAMP NOT NULL DEFAULT now(),
                     PRIMARY KEY (module, entity)
                 )",
                self.table_ref()
            ))
            .await?;
        Ok(())
    }

    /// The registered key column for an entity, if any.
    pub async fn key_column(&self, module: &str, entity: &str) -> ShadowResult<Option<String>> {
        let rows = self
            .db
            .query_rows(&format!(
                "SELECT key_column FROM {} WHERE module = '{}' AND entity = '{}'",
                self.table_ref(),
                escape_sql_string(module),
                escape_sql_string(entity)
            ))
            .await?;
        Ok(rows.into_iter().next().and_then(|mut r| r.pop()))
    }

    /// Register the key column for an entity.
    pub async fn register(&self, module: &str, entity: &str, key_column: &str) -> ShadowResult<()> {
        self.db
            .execute(&format!(
                "INSERT INTO {} (module, entity, key_column) VALUES ('{}', '{}', '{}')",
                self.table_ref(),
                escape_sql_string(module),
                escape_sql_string(entity),
                escape_sql_string(key_column)
            ))
            .await?;
        Ok(())
    }

    fn table_ref(&self) -> String {
        qualify(&self.schema, CATALOG_TABLE)
    }

    /// The shadow schema this catalog lives in.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Quoted, qualified shadow table reference for an entity.
    pub fn shadow_table_ref(&self, module: &str, entity: &str) -> String {
        qualify(
            &self.schema,
            &dw_core::sql_utils::shadow_table_name(module, entity),
        )
    }

    /// Unquoted dotted shadow table name for catalog introspection.
    pub fn shadow_table_lookup(&self, module: &str, entity: &str) -> String {
        format!(
            "{}.{}",
            self.schema,
            dw_core::sql_utils::shadow_table_name(module, entity)
        )
    }

    /// Quoted, qualified original table reference for an entity.
    pub fn original_table_ref(&self, module: &str, entity: &str) -> String {
        format!("{}.{}", quote_ident(module), quote_ident(entity))
    }

    /// Unquoted dotted original table name for catalog introspection.
    pub fn original_table_lookup(&self, module: &str, entity: &str) -> String {
        format!("{}.{}", module, entity)
    }
}
