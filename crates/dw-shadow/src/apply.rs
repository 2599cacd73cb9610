//! Apply engine: reconciles shadow data back into original tables.
//!
//! Reconciliation is keyed on the catalog's key column:
//! - listed columns update in place for rows present on both sides,
//! - rows present only in the shadow insert with every shadow column the
//!   original can accept (a new row needs full data, not just the listed
//!   subset),
//! - rows present only in the original are deleted when, and only when, the
//!   listed columns cover every shadow column. A full-list apply is the
//!   script's declaration that the shadow row set is authoritative; a
//!   partial list scopes the apply to those columns and never deletes.
//!
//! A missing original table is a no-op: the structural collaborator's
//! restore step performs the real copy once the table exists.

use crate::catalog::ShadowCatalog;
use crate::error::{ShadowError, ShadowResult};
use dw_core::sql_utils::{quote_ident, shadow_table_name};
use dw_core::ColumnType;
use dw_db::{ColumnInfo, Database};
use std::sync::Arc;

/// Reconciles shadow tables into original tables.
pub struct ApplyEngine {
    db: Arc<dyn Database>,
    catalog: ShadowCatalog,
}

impl ApplyEngine {
    /// Create an apply engine over the given shadow schema.
    pub fn new(db: Arc<dyn Database>, shadow_schema: impl Into<String>) -> Self {
        let catalog = ShadowCatalog::new(Arc::clone(&db), shadow_schema);
        Self { db, catalog }
    }

    /// Copy the listed columns from the shadow table into the original.
    pub async fn apply(
        &self,
        module: &str,
        entity: &str,
        columns: &[String],
    ) -> ShadowResult<()> {
        let table = shadow_table_name(module, entity);
        let shadow_ref = self.catalog.shadow_table_ref(module, entity);
        let shadow_cols = self
            .db
            .table_columns(&self.catalog.shadow_table_lookup(module, entity))
            .await?;
        if shadow_cols.is_empty() {
            return Err(ShadowError::ShadowTableMissing {
                module: module.to_string(),
                entity: entity.to_string(),
            });
        }

        let key = match self.catalog.key_column(module, entity).await? {
            Some(k) => k,
            None => {
                return Err(ShadowError::KeyColumnUnknown {
                    module: module.to_string(),
                    entity: entity.to_string(),
                })
            }
        };
        if !columns.iter().any(|c| c == &key) {
            return Err(ShadowError::ApplyMissingKey {
                module: module.to_string(),
                entity: entity.to_string(),
                key,
            });
        }

        // Every listed column must exist on the shadow side; a typo here
        // would otherwise silently propagate nothing.
        for column in columns {
            if !shadow_cols.iter().any(|c| &c.name == column) {
                return Err(ShadowError::MissingColumn {
                    table: table.clone(),
                    column: column.clone(),
                });
            }
        }

        let original_ref = self.catalog.original_table_ref(module, entity);
        let original_cols = self
            .db
            .table_columns(&self.catalog.original_table_lookup(module, entity))
            .await?;
        if original_cols.is_empty() {
            log::info!(
                "Apply deferred: {} does not exist yet; restore will copy the shadow data",
                original_ref
            );
            return Ok(());
        }
        let Some(original_key) = original_cols.iter().find(|c| c.name == key) else {
            log::warn!(
                "Apply skipped: {} exists but has no key column '{}'",
                original_ref,
                key
            );
            return Ok(());
        };
        let key_cast = original_key.data_type.clone();

        // Columns eligible for update: listed, on both sides, not the key.
        let mut updates = Vec::new();
        for column in columns {
            if column == &key {
                continue;
            }
            let Some(original) = original_cols.iter().find(|c| &c.name == column) else {
                log::debug!(
                    "Apply: column '{}' missing from {}; deferred to restore",
                    column,
                    original_ref
                );
                continue;
            };
            let Some(shadow) = shadow_cols.iter().find(|c| &c.name == column) else {
                continue;
            };
            check_copy_compatible(&table, shadow, original)?;
            updates.push(format!(
                "{col} = (SELECT CAST(s.{col} AS {ty}) FROM {shadow} AS s \
                 WHERE CAST(s.{k} AS {kt}) = {orig}.{k})",
                col = quote_ident(column),
                ty = original.data_type,
                shadow = shadow_ref,
                k = quote_ident(&key),
                kt = key_cast,
                orig = original_ref,
            ));
        }

        if !updates.is_empty() {
            self.db
                .execute_batch(&format!(
                    "UPDATE {orig} SET {updates} WHERE {orig}.{k} IN \
                     (SELECT CAST({k} AS {kt}) FROM {shadow})",
                    orig = original_ref,
                    updates = updates.join(", "),
                    k = quote_ident(&key),
                    kt = key_cast,
                    shadow = shadow_ref,
                ))
                .await?;
        }

        // Insert rows the original lacks, carrying every shadow column the
        // original can accept.
        let mut insert_names = Vec::new();
        let mut insert_selects = Vec::new();
        for shadow in &shadow_cols {
            let Some(original) = original_cols.iter().find(|c| c.name == shadow.name) else {
                continue;
            };
            check_copy_compatible(&table, shadow, original)?;
            insert_names.push(quote_ident(&shadow.name));
            insert_selects.push(format!(
                "CAST(s.{} AS {})",
                quote_ident(&shadow.name),
                original.data_type
            ));
        }
        let inserted = self
            .db
            .execute(&format!(
                "INSERT INTO {orig} ({names}) SELECT {selects} FROM {shadow} AS s \
                 WHERE CAST(s.{k} AS {kt}) NOT IN (SELECT {k} FROM {orig})",
                orig = original_ref,
                names = insert_names.join(", "),
                selects = insert_selects.join(", "),
                shadow = shadow_ref,
                k = quote_ident(&key),
                kt = key_cast,
            ))
            .await?;

        // Deletion only under a full column list.
        let full_list = shadow_cols
            .iter()
            .all(|c| columns.iter().any(|listed| listed == &c.name));
        let mut deleted = 0;
        if full_list {
            deleted = self
                .db
                .execute(&format!(
                    "DELETE FROM {orig} WHERE {k} NOT IN \
                     (SELECT CAST({k} AS {kt}) FROM {shadow})",
                    orig = original_ref,
                    k = quote_ident(&key),
                    kt = key_cast,
                    shadow = shadow_ref,
                ))
                .await?;
        }

        log::info!(
            "Applied {} -> {}: {} inserted, {} deleted",
            shadow_ref,
            original_ref,
            inserted,
            deleted
        );
        Ok(())
    }
}

/// Verify a shadow column's values can be copied into an original column.
fn check_copy_compatible(
    table: &str,
    shadow: &ColumnInfo,
    original: &ColumnInfo,
) -> ShadowResult<()> {
    let from = ColumnType::from_sql_type(&shadow.data_type);
    let to = ColumnType::from_sql_type(&original.data_type);
    let compatible = match (from, to) {
        (Some(f), Some(t)) => f.convertible_to(t),
        _ => shadow.data_type == original.data_type,
    };
    if compatible {
        Ok(())
    } else {
        Err(ShadowError::UnsupportedTypeConversion {
            table: table.to_string(),
            column: shadow.name.clone(),
            from: shadow.data_type.clone(),
            to: original.data_type.clone(),
        })
    }
}

#[cfg(test)]
#[path = "apply_test.rs"]
mod tests;
