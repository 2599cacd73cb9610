//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;

/// Name and declared SQL type of a table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,

    /// SQL data type as reported by the catalog (e.g. `VARCHAR`, `BIGINT`)
    pub data_type: String,
}

/// Database abstraction trait for Driftway
///
/// Implementations must be Send + Sync for async operation. Relation names
/// passed to introspection methods are unquoted and may be schema-qualified
/// (`schema.table`); names without a schema default to `main`.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute SQL that modifies data, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Execute query returning row count
    async fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// Execute a query returning a single 64-bit integer scalar
    async fn query_i64(&self, sql: &str) -> DbResult<i64>;

    /// Execute a query returning rows of text columns.
    ///
    /// Every selected column must be textual; cast non-text columns to
    /// VARCHAR in the query.
    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<String>>>;

    /// Check if a table or view exists
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Columns of a table in ordinal order, empty if the table is missing
    async fn table_columns(&self, name: &str) -> DbResult<Vec<ColumnInfo>>;

    /// Create a schema if it does not exist
    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()>;

    /// Open a transaction on the shared connection
    async fn begin_transaction(&self) -> DbResult<()>;

    /// Commit the open transaction
    async fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction
    async fn rollback(&self) -> DbResult<()>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
