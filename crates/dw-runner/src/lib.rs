//! dw-runner - Migration orchestrator for Driftway
//!
//! Drives a deployment run end to end: parse and validate the discovered
//! scripts, filter out tags the ledger has already seen, then execute the
//! remainder strictly in order, one transaction per script, halting the run
//! at the first failure. The ledger insert commits with the script body, so
//! a failed deployment re-runs safely from the failing script onward.

pub mod error;
pub mod runner;
pub mod session;

pub use error::{RunnerError, RunnerResult, StepError};
pub use runner::{MigrationRunner, PlannedScript, RunSummary, ScriptResult, ScriptStatus};
pub use session::ScriptSession;
