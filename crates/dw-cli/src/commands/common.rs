//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use dw_core::project::Project;
use dw_core::Config;
use dw_db::{Database, DuckDbBackend};
use dw_ledger::{DbLedger, ExecutionLedger};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Intentionally empty: ExitCode is a control-flow mechanism, not a
        // user-facing error; the real diagnostics were printed already.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Load the project with its target-resolved configuration.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let dir = Path::new(&global.project_dir);
    let config = Config::load_from_dir(dir)
        .with_context(|| format!("Failed to load project config from '{}'", global.project_dir))?;
    let config = config.resolve_target(global.target.as_deref())?;
    let project = Project::load_with_config(dir, config)?;
    Ok(project)
}

/// Open the target database and its ledger from a resolved config.
///
/// Relative database paths resolve against the project root.
pub(crate) async fn open_database(
    project: &Project,
) -> Result<(Arc<dyn Database>, Arc<dyn ExecutionLedger>)> {
    let raw_path = &project.config.database.path;
    log::debug!("Opening {} database at {}", project.config.database.db_type, raw_path);
    let db: Arc<dyn Database> = if raw_path == ":memory:" {
        Arc::new(DuckDbBackend::in_memory()?)
    } else {
        let path = if Path::new(raw_path).is_absolute() {
            Path::new(raw_path).to_path_buf()
        } else {
            project.root.join(raw_path)
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }
        Arc::new(DuckDbBackend::from_path(&path)?)
    };

    let ledger: Arc<dyn ExecutionLedger> = Arc::new(
        DbLedger::open(Arc::clone(&db), project.config.meta_schema.clone())
            .await
            .context("Failed to open execution ledger")?,
    );
    Ok((db, ledger))
}
