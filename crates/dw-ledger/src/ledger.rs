//! The execution ledger trait and its database-backed implementation.

use crate::error::{LedgerError, LedgerResult};
use crate::migration::run_migrations;
use async_trait::async_trait;
use dw_core::sql_utils::{escape_sql_string, qualify};
use dw_core::ScriptTag;
use dw_db::Database;
use std::sync::Arc;

/// Name of the ledger table inside the meta schema.
pub const LEDGER_TABLE: &str = "script_ledger";

/// One executed script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// The script's stable identity
    pub tag: ScriptTag,

    /// Owning package at execution time
    pub package: String,

    /// Script path at execution time (informational only)
    pub script_path: String,

    /// Execution timestamp as recorded by the database
    pub executed_at: String,
}

/// Persistent record of executed scripts, injected into the orchestrator.
///
/// `record_executed` must be called inside the same transaction as the
/// script body it records, so a mid-script failure leaves no entry.
#[async_trait]
pub trait ExecutionLedger: Send + Sync {
    /// Whether a tag has ever executed.
    async fn has_executed(&self, tag: &ScriptTag) -> LedgerResult<bool>;

    /// Record a tag as executed. Fails if the tag is already recorded.
    async fn record_executed(
        &self,
        tag: &ScriptTag,
        package: &str,
        script_path: &str,
    ) -> LedgerResult<()>;

    /// All entries in execution order.
    async fn entries(&self) -> LedgerResult<Vec<LedgerEntry>>;
}

/// Ledger stored in the target database's meta schema.
pub struct DbLedger {
    db: Arc<dyn Database>,
    meta_schema: String,
}

impl DbLedger {
    /// Open the ledger, running any pending meta schema migrations.
    pub async fn open(db: Arc<dyn Database>, meta_schema: impl Into<String>) -> LedgerResult<Self> {
        let meta_schema = meta_schema.into();
        run_migrations(db.as_ref(), &meta_schema).await?;
        Ok(Self { db, meta_schema })
    }

    fn table_ref(&self) -> String {
        qualify(&self.meta_schema, LEDGER_TABLE)
    }
}

#[async_trait]
impl ExecutionLedger for DbLedger {
    async fn has_executed(&self, tag: &ScriptTag) -> LedgerResult<bool> {
        let count = self
            .db
            .query_i64(&format!(
                "SELECT COUNT(*) FROM {} WHERE tag = '{}'",
                self.table_ref(),
                escape_sql_string(tag.as_str())
            ))
            .await?;
        Ok(count > 0)
    }

    async fn record_executed(
        &self,
        tag: &ScriptTag,
        package: &str,
        script_path: &str,
    ) -> LedgerResult<()> {
        self.db
            .execute(&format!(
                "INSERT INTO {} (tag, package, script_path) VALUES ('{}', '{}', '{}')",
                self.table_ref(),
                escape_sql_string(tag.as_str()),
                escape_sql_string(package),
                escape_sql_string(script_path)
            ))
            .await?;
        Ok(())
    }

    async fn entries(&self) -> LedgerResult<Vec<LedgerEntry>> {
        let rows = self
            .db
            .query_rows(&format!(
                "SELECT tag, package, script_path, CAST(executed_at AS VARCHAR) \
                 FROM {} ORDER BY executed_at, tag",
                self.table_ref()
            ))
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let [tag, package, script_path, executed_at]: [String; 4] =
                row.try_into().map_err(|row: Vec<String>| {
                    LedgerError::CorruptEntry(format!("expected 4 columns, got {}", row.len()))
                })?;
            let tag = ScriptTag::try_new(tag.clone())
                .ok_or_else(|| LedgerError::CorruptEntry(format!("invalid tag '{}'", tag)))?;
            entries.push(LedgerEntry {
                tag,
                package,
                script_path,
                executed_at,
            });
        }
        Ok(entries)
    }
}
