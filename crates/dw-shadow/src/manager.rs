//! Shadow schema manager: the `use` / backup / restore side of the protocol.
//!
//! Population rules, in order of precedence:
//! 1. A (table, column) pair populates from the original at most once per
//!    run; later `use` calls are no-ops so earlier scripts' edits survive.
//! 2. A missing original table or column skips population without error;
//!    the shadow column simply starts empty or keeps prior backup data.
//! 3. Every copy between an original and a shadow column goes through the
//!    [`ColumnType`] compatibility table; unsupported pairs fail the script.

use crate::catalog::ShadowCatalog;
use crate::error::{ShadowError, ShadowResult};
use crate::population::PopulationRecord;
use dw_core::sql_utils::{quote_ident, shadow_table_name};
use dw_core::ColumnType;
use dw_db::{ColumnInfo, Database};
use std::sync::Arc;

/// Owns shadow table DDL, run-scoped population, and the backup/restore
/// hooks invoked by the structural migration collaborator.
pub struct ShadowSchemaManager {
    db: Arc<dyn Database>,
    catalog: ShadowCatalog,
    population: PopulationRecord,
}

impl ShadowSchemaManager {
    /// Create a manager over the given shadow schema.
    pub fn new(db: Arc<dyn Database>, shadow_schema: impl Into<String>) -> Self {
        let catalog = ShadowCatalog::new(Arc::clone(&db), shadow_schema);
        Self {
            db,
            catalog,
            population: PopulationRecord::new(),
        }
    }

    /// Start a fresh deployment run: all population history is forgotten.
    pub fn begin_run(&mut self) {
        self.population.clear();
    }

    /// The shadow catalog handle.
    pub fn catalog(&self) -> &ShadowCatalog {
        &self.catalog
    }

    /// Ensure a shadow column for (module, entity, column) exists with the
    /// declared type and is populated from the original at most once this
    /// run.
    pub async fn use_column(
        &mut self,
        module: &str,
        entity: &str,
        column: &str,
        ty: ColumnType,
        key: bool,
    ) -> ShadowResult<()> {
        self.catalog.ensure().await?;

        let table = shadow_table_name(module, entity);
        let shadow_ref = self.catalog.shadow_table_ref(module, entity);
        let shadow_lookup = self.catalog.shadow_table_lookup(module, entity);
        let registered = self.catalog.key_column(module, entity).await?;

        if key {
            if let Some(reg) = &registered {
                if reg != column {
                    return Err(ShadowError::KeyColumnMismatch {
                        module: module.to_string(),
                        entity: entity.to_string(),
                        declared: column.to_string(),
                        registered: reg.clone(),
                    });
                }
            }
        } else if registered.is_none() {
            return Err(ShadowError::KeyColumnUnknown {
                module: module.to_string(),
                entity: entity.to_string(),
            });
        }

        let shadow_cols = self.db.table_columns(&shadow_lookup).await?;
        if shadow_cols.is_empty() {
            // The table starts with its key column so every later column
            // has a row identity to correlate against.
            if !key {
                return Err(ShadowError::KeyColumnUnknown {
                    module: module.to_string(),
                    entity: entity.to_string(),
                });
            }
            log::debug!("Creating shadow table {}", shadow_ref);
            self.db
                .execute_batch(&format!(
                    "CREATE TABLE {} ({} {})",
                    shadow_ref,
                    quote_ident(column),
                    ty.sql_type()
                ))
                .await?;
        } else {
            match shadow_cols.iter().find(|c| c.name == column) {
                Some(info) => {
                    self.reconcile_column_type(&table, &shadow_ref, info, ty)
                        .await?
                }
                None => {
                    self.db
                        .execute_batch(&format!(
                            "ALTER TABLE {} ADD COLUMN {} {}",
                            shadow_ref,
                            quote_ident(column),
                            ty.sql_type()
                        ))
                        .await?;
                }
            }
        }

        if key && registered.is_none() {
            self.catalog.register(module, entity, column).await?;
        }

        if self.population.is_populated(&table, column) {
            log::debug!(
                "Shadow column {}.{} already populated this run; keeping in-run edits",
                table,
                column
            );
            return Ok(());
        }

        let key_column = match self.catalog.key_column(module, entity).await? {
            Some(k) => k,
            None => {
                return Err(ShadowError::KeyColumnUnknown {
                    module: module.to_string(),
                    entity: entity.to_string(),
                })
            }
        };

        self.populate_from_original(module, entity, column, ty, &key_column)
            .await?;
        self.population.mark(&table, column);
        Ok(())
    }

    /// Copy one column's values from the original table, skipping silently
    /// when the original table or column does not exist.
    async fn populate_from_original(
        &self,
        module: &str,
        entity: &str,
        column: &str,
        ty: ColumnType,
        key_column: &str,
    ) -> ShadowResult<()> {
        let table = shadow_table_name(module, entity);
        let shadow_ref = self.catalog.shadow_table_ref(module, entity);
        let original_ref = self.catalog.original_table_ref(module, entity);
        let original_cols = self
            .db
            .table_columns(&self.catalog.original_table_lookup(module, entity))
            .await?;

        let Some(original) = original_cols.iter().find(|c| c.name == column) else {
            log::debug!(
                "Original column {}.{} absent; shadow column left as-is",
                original_ref,
                column
            );
            return Ok(());
        };

        let from = ColumnType::from_sql_type(&original.data_type);
        if !from.is_some_and(|f| f.convertible_to(ty)) {
            return Err(ShadowError::UnsupportedTypeConversion {
                table,
                column: column.to_string(),
                from: original.data_type.clone(),
                to: ty.to_string(),
            });
        }

        if column == key_column {
            self.sync_key_rows(&shadow_ref, &original_ref, key_column, ty.sql_type())
                .await?;
        } else {
            if !original_cols.iter().any(|c| c.name == key_column) {
                log::warn!(
                    "Original {} has no key column '{}'; cannot correlate rows, skipping copy of '{}'",
                    original_ref,
                    key_column,
                    column
                );
                return Ok(());
            }
            let key_type = self
                .shadow_column_type(module, entity, key_column)
                .await?
                .unwrap_or_else(|| "VARCHAR".to_string());
            self.db
                .execute_batch(&format!(
                    "UPDATE {shadow} AS s SET {col} = CAST(o.{col} AS {ty}) \
                     FROM {orig} AS o WHERE s.{key} = CAST(o.{key} AS {key_ty})",
                    shadow = shadow_ref,
                    orig = original_ref,
                    col = quote_ident(column),
                    key = quote_ident(key_column),
                    ty = ty.sql_type(),
                    key_ty = key_type,
                ))
                .await?;
        }
        Ok(())
    }

    /// Reconcile the shadow row set with the original's key set: insert keys
    /// the shadow lacks, delete keys the original no longer has. Surviving
    /// rows keep the values already sitting in their other shadow columns.
    async fn sync_key_rows(
        &self,
        shadow_ref: &str,
        original_ref: &str,
        key_column: &str,
        key_sql_type: &str,
    ) -> ShadowResult<()> {
        let key = quote_ident(key_column);
        self.db
            .execute_batch(&format!(
                "DELETE FROM {shadow} WHERE {key} NOT IN \
                     (SELECT CAST({key} AS {ty}) FROM {orig});
                 INSERT INTO {shadow} ({key}) \
                     SELECT CAST({key} AS {ty}) FROM {orig} \
                     WHERE CAST({key} AS {ty}) NOT IN (SELECT {key} FROM {shadow});",
                shadow = shadow_ref,
                orig = original_ref,
                key = key,
                ty = key_sql_type,
            ))
            .await?;
        Ok(())
    }

    /// Bring an existing shadow column to the declared type, or fail if the
    /// conversion is unsupported.
    async fn reconcile_column_type(
        &self,
        table: &str,
        shadow_ref: &str,
        info: &ColumnInfo,
        declared: ColumnType,
    ) -> ShadowResult<()> {
        match ColumnType::from_sql_type(&info.data_type) {
            Some(existing) if existing == declared => Ok(()),
            Some(existing) if existing.convertible_to(declared) => {
                log::debug!(
                    "Converting shadow column {}.{} from {} to {}",
                    table,
                    info.name,
                    existing,
                    declared
                );
                self.db
                    .execute_batch(&format!(
                        "ALTER TABLE {} ALTER COLUMN {} SET DATA TYPE {}",
                        shadow_ref,
                        quote_ident(&info.name),
                        declared.sql_type()
                    ))
                    .await?;
                Ok(())
            }
            _ => Err(ShadowError::UnsupportedTypeConversion {
                table: table.to_string(),
                column: info.name.clone(),
                from: info.data_type.clone(),
                to: declared.to_string(),
            }),
        }
    }

    /// Back up an entity into its shadow table just before the structural
    /// collaborator drops it. Every original column is mirrored and
    /// force-populated; the copies count as this run's population.
    pub async fn backup_on_drop(
        &mut self,
        module: &str,
        entity: &str,
        key_column: &str,
    ) -> ShadowResult<()> {
        self.catalog.ensure().await?;

        let original_ref = self.catalog.original_table_ref(module, entity);
        let original_lookup = self.catalog.original_table_lookup(module, entity);
        let original_cols = self.db.table_columns(&original_lookup).await?;
        if original_cols.is_empty() {
            log::warn!("Nothing to back up: {} does not exist", original_ref);
            return Ok(());
        }
        let Some(key_info) = original_cols.iter().find(|c| c.name == key_column) else {
            return Err(ShadowError::MissingColumn {
                table: original_lookup,
                column: key_column.to_string(),
            });
        };

        let registered = self.catalog.key_column(module, entity).await?;
        if let Some(reg) = &registered {
            if reg != key_column {
                return Err(ShadowError::KeyColumnMismatch {
                    module: module.to_string(),
                    entity: entity.to_string(),
                    declared: key_column.to_string(),
                    registered: reg.clone(),
                });
            }
        }

        let table = shadow_table_name(module, entity);
        let shadow_ref = self.catalog.shadow_table_ref(module, entity);
        let shadow_lookup = self.catalog.shadow_table_lookup(module, entity);

        let mut shadow_cols = self.db.table_columns(&shadow_lookup).await?;
        if shadow_cols.is_empty() {
            self.db
                .execute_batch(&format!(
                    "CREATE TABLE {} ({} {})",
                    shadow_ref,
                    quote_ident(key_column),
                    key_info.data_type
                ))
                .await?;
            shadow_cols = self.db.table_columns(&shadow_lookup).await?;
        }
        if registered.is_none() {
            self.catalog.register(module, entity, key_column).await?;
        }

        // Mirror every original column; existing shadow columns must accept
        // the original's values.
        for original in &original_cols {
            match shadow_cols.iter().find(|c| c.name == original.name) {
                None => {
                    self.db
                        .execute_batch(&format!(
                            "ALTER TABLE {} ADD COLUMN {} {}",
                            shadow_ref,
                            quote_ident(&original.name),
                            original.data_type
                        ))
                        .await?;
                }
                Some(existing) => {
                    let from = ColumnType::from_sql_type(&original.data_type);
                    let to = ColumnType::from_sql_type(&existing.data_type);
                    let compatible = match (from, to) {
                        (Some(f), Some(t)) => f.convertible_to(t),
                        _ => original.data_type == existing.data_type,
                    };
                    if !compatible {
                        return Err(ShadowError::UnsupportedTypeConversion {
                            table: table.clone(),
                            column: original.name.clone(),
                            from: original.data_type.clone(),
                            to: existing.data_type.clone(),
                        });
                    }
                }
            }
        }

        let shadow_cols = self.db.table_columns(&shadow_lookup).await?;
        let key_type = shadow_cols
            .iter()
            .find(|c| c.name == key_column)
            .map(|c| c.data_type.clone())
            .unwrap_or_else(|| "VARCHAR".to_string());

        self.sync_key_rows(&shadow_ref, &original_ref, key_column, &key_type)
            .await?;
        self.population.mark(&table, key_column);

        for original in &original_cols {
            if original.name == key_column {
                continue;
            }
            let target_type = shadow_cols
                .iter()
                .find(|c| c.name == original.name)
                .map(|c| c.data_type.clone())
                .unwrap_or_else(|| original.data_type.clone());
            self.db
                .execute_batch(&format!(
                    "UPDATE {shadow} AS s SET {col} = CAST(o.{col} AS {ty}) \
                     FROM {orig} AS o WHERE s.{key} = CAST(o.{key} AS {key_ty})",
                    shadow = shadow_ref,
                    orig = original_ref,
                    col = quote_ident(&original.name),
                    key = quote_ident(key_column),
                    ty = target_type,
                    key_ty = key_type,
                ))
                .await?;
            self.population.mark(&table, &original.name);
        }

        log::info!("Backed up {} into {}", original_ref, shadow_ref);
        Ok(())
    }

    /// Restore shadow data into a freshly recreated original table. No-op
    /// when the entity has no shadow table.
    pub async fn restore_on_create(&self, module: &str, entity: &str) -> ShadowResult<()> {
        let shadow_ref = self.catalog.shadow_table_ref(module, entity);
        let shadow_cols = self
            .db
            .table_columns(&self.catalog.shadow_table_lookup(module, entity))
            .await?;
        if shadow_cols.is_empty() {
            log::debug!("No shadow data for {}.{}; nothing to restore", module, entity);
            return Ok(());
        }

        let original_ref = self.catalog.original_table_ref(module, entity);
        let original_cols = self
            .db
            .table_columns(&self.catalog.original_table_lookup(module, entity))
            .await?;
        if original_cols.is_empty() {
            log::warn!(
                "Restore requested but {} does not exist; skipping",
                original_ref
            );
            return Ok(());
        }

        let table = shadow_table_name(module, entity);
        let mut names = Vec::new();
        let mut selects = Vec::new();
        for shadow in &shadow_cols {
            let Some(original) = original_cols.iter().find(|c| c.name == shadow.name) else {
                continue;
            };
            let from = ColumnType::from_sql_type(&shadow.data_type);
            let to = ColumnType::from_sql_type(&original.data_type);
            let compatible = match (from, to) {
                (Some(f), Some(t)) => f.convertible_to(t),
                _ => shadow.data_type == original.data_type,
            };
            if !compatible {
                return Err(ShadowError::UnsupportedTypeConversion {
                    table: table.clone(),
                    column: shadow.name.clone(),
                    from: shadow.data_type.clone(),
                    to: original.data_type.clone(),
                });
            }
            names.push(quote_ident(&shadow.name));
            selects.push(format!(
                "CAST(s.{} AS {})",
                quote_ident(&shadow.name),
                original.data_type
            ));
        }

        if names.is_empty() {
            log::warn!(
                "Restore requested but {} shares no columns with its shadow table",
                original_ref
            );
            return Ok(());
        }

        let restored = self
            .db
            .execute(&format!(
                "INSERT INTO {} ({}) SELECT {} FROM {} AS s",
                original_ref,
                names.join(", "),
                selects.join(", "),
                shadow_ref
            ))
            .await?;
        log::info!("Restored {} rows from {} into {}", restored, shadow_ref, original_ref);
        Ok(())
    }

    /// The SQL type of a shadow column, if the column exists.
    async fn shadow_column_type(
        &self,
        module: &str,
        entity: &str,
        column: &str,
    ) -> ShadowResult<Option<String>> {
        let cols = self
            .db
            .table_columns(&self.catalog.shadow_table_lookup(module, entity))
            .await?;
        Ok(cols
            .into_iter()
            .find(|c| c.name == column)
            .map(|c| c.data_type))
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
