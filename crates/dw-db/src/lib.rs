//! dw-db - Database abstraction layer for Driftway
//!
//! Defines the [`Database`] trait the engine runs against and the DuckDB
//! backend implementing it. The orchestrator, shadow manager, and ledger all
//! share one handle so that a script body and its ledger entry commit in the
//! same transaction.

pub mod duckdb;
pub mod error;
pub mod traits;

pub use crate::duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{ColumnInfo, Database};
