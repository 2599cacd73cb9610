//! Error types for dw-shadow

use dw_db::DbError;
use thiserror::Error;

/// Shadow protocol errors
#[derive(Error, Debug)]
pub enum ShadowError {
    /// S001: Declared type cannot be reconciled with an existing column type.
    /// Resolved manually by the script author - adjust the declared type or
    /// add an explicit conversion step before the copy.
    #[error("[S001] Unsupported type conversion for {table}.{column}: {from} -> {to}")]
    UnsupportedTypeConversion {
        table: String,
        column: String,
        from: String,
        to: String,
    },

    /// S002: No key column is known for the entity; the first `use` of an
    /// entity must carry the `key` marker
    #[error("[S002] No key column known for {module}.{entity}; declare one with 'use {module}.{entity} key <column> <type>'")]
    KeyColumnUnknown { module: String, entity: String },

    /// S003: A `key` marker disagrees with the registered key column
    #[error("[S003] Key column mismatch for {module}.{entity}: declared '{declared}' but '{registered}' is registered")]
    KeyColumnMismatch {
        module: String,
        entity: String,
        declared: String,
        registered: String,
    },

    /// S004: Apply was called for an entity with no shadow table
    #[error("[S004] No shadow table exists for {module}.{entity}; apply requires a prior use or backup")]
    ShadowTableMissing { module: String, entity: String },

    /// S005: Apply column list does not include the key column
    #[error("[S005] Apply for {module}.{entity} must include the key column '{key}'")]
    ApplyMissingKey {
        module: String,
        entity: String,
        key: String,
    },

    /// S006: A referenced column does not exist
    #[error("[S006] Column '{column}' does not exist in {table}")]
    MissingColumn { table: String, column: String },

    /// Underlying database error
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type alias for ShadowError
pub type ShadowResult<T> = Result<T, ShadowError>;
