//! dw-script - Script parsing layer for Driftway
//!
//! Migration scripts are plain SQL files carrying structured comment
//! directives (`-- driftway:...`). This crate extracts the tag marker, the
//! `use` declarations, the statement batches, and the `apply` calls; the SQL
//! itself stays opaque and is executed verbatim by the orchestrator.

pub mod error;
pub mod parser;

pub use error::{ScriptError, ScriptResult};
pub use parser::{parse_script, ApplyDecl, ParsedScript, UseDecl};
