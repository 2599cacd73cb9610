//! Error types for dw-ledger

use dw_db::DbError;
use thiserror::Error;

/// Ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    /// L001: Meta schema migration failed
    #[error("[L001] Ledger migration failed: {0}")]
    MigrationError(String),

    /// L002: A ledger row could not be read back
    #[error("[L002] Corrupt ledger entry: {0}")]
    CorruptEntry(String),

    /// Underlying database error
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type alias for LedgerError
pub type LedgerResult<T> = Result<T, LedgerError>;
