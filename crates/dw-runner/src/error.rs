//! Error types for dw-runner

use dw_core::{CoreError, ScriptTag};
use dw_db::DbError;
use dw_ledger::LedgerError;
use dw_script::ScriptError;
use dw_shadow::ShadowError;
use thiserror::Error;

/// An error raised by one step of a script body (use, statement batch,
/// apply, or the ledger insert).
#[derive(Error, Debug)]
pub enum StepError {
    /// Database statement error
    #[error(transparent)]
    Db(#[from] DbError),

    /// Shadow protocol error
    #[error(transparent)]
    Shadow(#[from] ShadowError),

    /// Ledger error
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Orchestrator errors
#[derive(Error, Debug)]
pub enum RunnerError {
    /// R001: Two scripts in the run set carry the same tag
    #[error("[R001] Duplicate tag '{tag}' in {first} and {second}")]
    DuplicateTag {
        tag: ScriptTag,
        first: String,
        second: String,
    },

    /// R002: A discovered script could not be parsed
    #[error("[R002] Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ScriptError,
    },

    /// R003: A script body failed; its transaction was rolled back
    #[error("[R003] Script '{tag}' ({path}) failed: {source}")]
    ScriptFailed {
        tag: ScriptTag,
        path: String,
        #[source]
        source: StepError,
    },

    /// Discovery or ordering error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Ledger error outside any script transaction
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Result type alias for RunnerError
pub type RunnerResult<T> = Result<T, RunnerError>;
