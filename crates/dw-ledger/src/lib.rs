//! dw-ledger - Execution ledger for Driftway
//!
//! The ledger is the persistent record of which script tags have executed
//! against a database. It lives in the target database itself so that the
//! ledger insert joins the script body's transaction: a mid-script failure
//! leaves no entry and the script re-runs safely on the next deployment.

pub mod ddl;
pub mod error;
pub mod ledger;
pub mod migration;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{DbLedger, ExecutionLedger, LedgerEntry};
pub use migration::run_migrations;
