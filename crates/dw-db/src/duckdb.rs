//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{ColumnInfo, Database};
use async_trait::async_trait;
use duckdb::Connection;
use dw_core::sql_utils::escape_sql_string;
use std::path::Path;
use std::sync::Mutex;

/// DuckDB database backend
///
/// One connection behind a mutex: deployment execution is strictly
/// sequential, so the mutex only guards against accidental cross-task use.
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", e, path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Execute SQL synchronously
    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(sql, [])
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    /// Execute batch SQL synchronously
    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    /// Query a single i64 scalar synchronously
    fn query_i64_sync(&self, sql: &str) -> DbResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(sql, [], |row| row.get(0))
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    /// Query rows of text columns synchronously
    fn query_rows_sync(&self, sql: &str) -> DbResult<Vec<Vec<String>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| DbError::ExecutionError(e.to_string()))?
        {
            let count = row.as_ref().column_count();
            let mut record = Vec::with_capacity(count);
            for i in 0..count {
                let value: Option<String> = row
                    .get(i)
                    .map_err(|e| DbError::ExecutionError(e.to_string()))?;
                record.push(value.unwrap_or_default());
            }
            out.push(record);
        }
        Ok(out)
    }

    /// Split an unquoted relation name into (schema, table), defaulting the
    /// schema to `main`.
    fn split_name(name: &str) -> (&str, &str) {
        match name.rfind('.') {
            Some(pos) => (&name[..pos], &name[pos + 1..]),
            None => ("main", name),
        }
    }

    /// Check if relation exists synchronously
    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        let (schema, table) = Self::split_name(name);
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = '{}' AND table_name = '{}'",
            escape_sql_string(schema),
            escape_sql_string(table)
        );

        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| DbError::IntrospectionError {
                relation: name.to_string(),
                message: e.to_string(),
            })?;
        Ok(count > 0)
    }

    /// List table columns synchronously
    fn table_columns_sync(&self, name: &str) -> DbResult<Vec<ColumnInfo>> {
        let (schema, table) = Self::split_name(name);
        let sql = format!(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_schema = '{}' AND table_name = '{}' ORDER BY ordinal_position",
            escape_sql_string(schema),
            escape_sql_string(table)
        );

        let rows = self.query_rows_sync(&sql)?;
        Ok(rows
            .into_iter()
            .filter(|row| row.len() == 2)
            .map(|mut row| {
                let data_type = row.pop().unwrap_or_default();
                let name = row.pop().unwrap_or_default();
                ColumnInfo { name, data_type }
            })
            .collect())
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        let count = self.query_i64_sync(&format!("SELECT COUNT(*) FROM ({})", sql))?;
        Ok(count as usize)
    }

    async fn query_i64(&self, sql: &str) -> DbResult<i64> {
        self.query_i64_sync(sql)
    }

    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<String>>> {
        self.query_rows_sync(sql)
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    async fn table_columns(&self, name: &str) -> DbResult<Vec<ColumnInfo>> {
        self.table_columns_sync(name)
    }

    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()> {
        let sql = format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            dw_core::sql_utils::quote_ident(schema)
        );
        self.execute_sync(&sql)?;
        Ok(())
    }

    async fn begin_transaction(&self) -> DbResult<()> {
        self.execute_batch_sync("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {}", e)))
    }

    async fn commit(&self) -> DbResult<()> {
        self.execute_batch_sync("COMMIT")
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {}", e)))
    }

    async fn rollback(&self) -> DbResult<()> {
        self.execute_batch_sync("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {}", e)))
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory() {
        let db = DuckDbBackend::in_memory().unwrap();
        assert_eq!(db.db_type(), "duckdb");
    }

    #[tokio::test]
    async fn test_execute_and_count() {
        let db = DuckDbBackend::in_memory().unwrap();
        db.execute_batch("CREATE TABLE nums AS SELECT * FROM range(10) t(n)")
            .await
            .unwrap();

        let count = db.query_count("SELECT * FROM nums").await.unwrap();
        assert_eq!(count, 10);
    }

    #[tokio::test]
    async fn test_query_i64() {
        let db = DuckDbBackend::in_memory().unwrap();
        let value = db.query_i64("SELECT 41 + 1").await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_query_rows() {
        let db = DuckDbBackend::in_memory().unwrap();
        db.execute_batch("CREATE TABLE t (a VARCHAR, b VARCHAR); INSERT INTO t VALUES ('x', NULL);")
            .await
            .unwrap();

        let rows = db.query_rows("SELECT a, b FROM t").await.unwrap();
        assert_eq!(rows, vec![vec!["x".to_string(), String::new()]]);
    }

    #[tokio::test]
    async fn test_relation_exists() {
        let db = DuckDbBackend::in_memory().unwrap();
        assert!(!db.relation_exists("missing").await.unwrap());

        db.execute_batch("CREATE TABLE present (id INTEGER)")
            .await
            .unwrap();
        assert!(db.relation_exists("present").await.unwrap());
        assert!(db.relation_exists("main.present").await.unwrap());
    }

    #[tokio::test]
    async fn test_table_columns() {
        let db = DuckDbBackend::in_memory().unwrap();
        db.execute_batch("CREATE TABLE t (id INTEGER, name VARCHAR)")
            .await
            .unwrap();

        let columns = db.table_columns("t").await.unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "id");
        assert_eq!(columns[0].data_type, "INTEGER");
        assert_eq!(columns[1].name, "name");
        assert_eq!(columns[1].data_type, "VARCHAR");

        assert!(db.table_columns("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_schema_if_not_exists() {
        let db = DuckDbBackend::in_memory().unwrap();
        db.create_schema_if_not_exists("staging").await.unwrap();
        db.create_schema_if_not_exists("staging").await.unwrap();

        db.execute_batch("CREATE TABLE staging.t (id INTEGER)")
            .await
            .unwrap();
        assert!(db.relation_exists("staging.t").await.unwrap());
    }

    #[tokio::test]
    async fn test_transaction_rollback() {
        let db = DuckDbBackend::in_memory().unwrap();
        db.execute_batch("CREATE TABLE t (id INTEGER)").await.unwrap();

        db.begin_transaction().await.unwrap();
        db.execute("INSERT INTO t VALUES (1)").await.unwrap();
        db.rollback().await.unwrap();

        assert_eq!(db.query_count("SELECT * FROM t").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transaction_commit() {
        let db = DuckDbBackend::in_memory().unwrap();
        db.execute_batch("CREATE TABLE t (id INTEGER)").await.unwrap();

        db.begin_transaction().await.unwrap();
        db.execute("INSERT INTO t VALUES (1)").await.unwrap();
        db.commit().await.unwrap();

        assert_eq!(db.query_count("SELECT * FROM t").await.unwrap(), 1);
    }
}
