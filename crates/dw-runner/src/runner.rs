//! The migration orchestrator.
//!
//! State machine per deployment run:
//! `Plan(parse + tag check) -> Filter(ledger) -> [ExecuteOne]* -> Done`,
//! with `ExecuteOne = BEGIN -> script body -> record tag -> COMMIT` and any
//! failure rolling back and halting the run. Remaining scripts are deferred
//! to the next deployment attempt; nothing is skipped-and-continued, because
//! later scripts' shadow state depends on earlier scripts having run.

use crate::error::{RunnerError, RunnerResult, StepError};
use crate::session::ScriptSession;
use chrono::{DateTime, Utc};
use dw_core::project::{Project, ScriptFile};
use dw_core::ScriptTag;
use dw_db::Database;
use dw_ledger::ExecutionLedger;
use dw_script::{parse_script, ParsedScript};
use dw_shadow::{ApplyEngine, ShadowSchemaManager};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Outcome of one script within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStatus {
    /// Body executed and the tag was recorded this run
    Executed,
    /// Tag was already in the ledger; body not executed
    Skipped,
    /// Body failed; transaction rolled back, run halted
    Failed,
}

impl std::fmt::Display for ScriptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptStatus::Executed => write!(f, "executed"),
            ScriptStatus::Skipped => write!(f, "skipped"),
            ScriptStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Per-script result reported back to the caller.
#[derive(Debug, Clone)]
pub struct ScriptResult {
    /// Script tag
    pub tag: ScriptTag,

    /// Owning package
    pub package: String,

    /// Path relative to the package root
    pub rel_path: String,

    /// Outcome
    pub status: ScriptStatus,

    /// Execution time in seconds (0 for skipped scripts)
    pub duration_secs: f64,

    /// Error message for failed scripts
    pub error: Option<String>,
}

/// A script that passed planning: parsed, tag-checked, ledger-checked.
#[derive(Debug)]
pub struct PlannedScript {
    /// The discovered file
    pub file: ScriptFile,

    /// Its parsed form
    pub script: ParsedScript,

    /// Whether the ledger already holds this tag
    pub already_executed: bool,
}

/// Summary of one deployment run.
#[derive(Debug)]
pub struct RunSummary {
    /// Short identifier for this run, used in logs
    pub run_id: String,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Per-script results in execution order
    pub results: Vec<ScriptResult>,

    /// Scripts never attempted because the run halted before them
    pub deferred: usize,
}

impl RunSummary {
    /// Number of scripts whose bodies executed.
    pub fn executed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == ScriptStatus::Executed)
            .count()
    }

    /// Number of scripts skipped via the ledger.
    pub fn skipped_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == ScriptStatus::Skipped)
            .count()
    }

    /// The failing script, if the run halted.
    pub fn failure(&self) -> Option<&ScriptResult> {
        self.results
            .iter()
            .find(|r| r.status == ScriptStatus::Failed)
    }
}

/// Executes a deployment run against one database.
pub struct MigrationRunner {
    db: Arc<dyn Database>,
    ledger: Arc<dyn ExecutionLedger>,
    shadow: ShadowSchemaManager,
    apply: ApplyEngine,
}

impl MigrationRunner {
    /// Create a runner over a shared database handle and an injected ledger.
    pub fn new(
        db: Arc<dyn Database>,
        ledger: Arc<dyn ExecutionLedger>,
        shadow_schema: &str,
    ) -> Self {
        let shadow = ShadowSchemaManager::new(Arc::clone(&db), shadow_schema);
        let apply = ApplyEngine::new(Arc::clone(&db), shadow_schema);
        Self {
            db,
            ledger,
            shadow,
            apply,
        }
    }

    /// The shadow manager, for the structural migration collaborator's
    /// backup/restore calls around its own DDL.
    pub fn shadow_mut(&mut self) -> &mut ShadowSchemaManager {
        &mut self.shadow
    }

    /// Parse and validate the discovered scripts, then mark which of them
    /// the ledger has already seen. Fails on the first malformed script or
    /// duplicate tag, before anything executes.
    pub async fn plan(&self, scripts: &[ScriptFile]) -> RunnerResult<Vec<PlannedScript>> {
        let mut seen: HashMap<ScriptTag, String> = HashMap::new();
        let mut planned = Vec::with_capacity(scripts.len());

        for file in scripts {
            let script = parse_script(&file.source).map_err(|source| RunnerError::Parse {
                path: file.path.display().to_string(),
                source,
            })?;

            let location = format!("{}/{}", file.package, file.rel_path);
            if let Some(first) = seen.insert(script.tag.clone(), location.clone()) {
                return Err(RunnerError::DuplicateTag {
                    tag: script.tag,
                    first,
                    second: location,
                });
            }

            let already_executed = self.ledger.has_executed(&script.tag).await?;
            planned.push(PlannedScript {
                file: file.clone(),
                script,
                already_executed,
            });
        }

        Ok(planned)
    }

    /// Execute a deployment run over the given ordered script set.
    ///
    /// Returns `Err` only for failures before execution starts (parse
    /// errors, duplicate tags, ledger access). A script failure mid-run is
    /// reported in the summary's `Failed` entry; everything committed before
    /// it stays committed.
    pub async fn run(&mut self, scripts: &[ScriptFile]) -> RunnerResult<RunSummary> {
        let run_id = Uuid::new_v4().to_string()[..8].to_string();
        let started_at = Utc::now();
        let planned = self.plan(scripts).await?;

        log::info!(
            "Run {}: {} scripts discovered, {} pending",
            run_id,
            planned.len(),
            planned.iter().filter(|p| !p.already_executed).count()
        );

        self.shadow.begin_run();

        let mut results = Vec::with_capacity(planned.len());
        let mut deferred = 0;
        let mut halted = false;

        for entry in &planned {
            if halted {
                deferred += 1;
                continue;
            }

            if entry.already_executed {
                log::debug!("Skipping '{}': already in the ledger", entry.script.tag);
                results.push(ScriptResult {
                    tag: entry.script.tag.clone(),
                    package: entry.file.package.to_string(),
                    rel_path: entry.file.rel_path.clone(),
                    status: ScriptStatus::Skipped,
                    duration_secs: 0.0,
                    error: None,
                });
                continue;
            }

            let start = Instant::now();
            match self.execute_one(entry).await {
                Ok(()) => {
                    results.push(ScriptResult {
                        tag: entry.script.tag.clone(),
                        package: entry.file.package.to_string(),
                        rel_path: entry.file.rel_path.clone(),
                        status: ScriptStatus::Executed,
                        duration_secs: start.elapsed().as_secs_f64(),
                        error: None,
                    });
                }
                Err(source) => {
                    let error = RunnerError::ScriptFailed {
                        tag: entry.script.tag.clone(),
                        path: entry.file.path.display().to_string(),
                        source,
                    };
                    log::error!("{}", error);
                    results.push(ScriptResult {
                        tag: entry.script.tag.clone(),
                        package: entry.file.package.to_string(),
                        rel_path: entry.file.rel_path.clone(),
                        status: ScriptStatus::Failed,
                        duration_secs: start.elapsed().as_secs_f64(),
                        error: Some(error.to_string()),
                    });
                    halted = true;
                }
            }
        }

        Ok(RunSummary {
            run_id,
            started_at,
            results,
            deferred,
        })
    }

    /// Discover, order, and run everything pending in a project. Entry point
    /// for the structural migration collaborator, which runs pending scripts
    /// before applying structural changes.
    pub async fn run_pending(&mut self, project: &Project) -> RunnerResult<RunSummary> {
        let scripts = project.ordered_scripts()?;
        self.run(&scripts).await
    }

    /// One script: BEGIN, body, ledger insert, COMMIT; rollback on any
    /// failure.
    async fn execute_one(&mut self, entry: &PlannedScript) -> Result<(), StepError> {
        self.db.begin_transaction().await?;

        let outcome = self.execute_body(entry).await;
        match outcome {
            Ok(()) => match self.db.commit().await {
                Ok(()) => Ok(()),
                Err(e) => {
                    self.try_rollback().await;
                    Err(e.into())
                }
            },
            Err(e) => {
                self.try_rollback().await;
                Err(e)
            }
        }
    }

    async fn execute_body(&mut self, entry: &PlannedScript) -> Result<(), StepError> {
        let mut session = ScriptSession::new(self.db.as_ref(), &mut self.shadow, &self.apply);
        session.run(&entry.script).await?;
        self.ledger
            .record_executed(
                &entry.script.tag,
                entry.file.package.as_str(),
                &entry.file.rel_path,
            )
            .await?;
        Ok(())
    }

    async fn try_rollback(&self) {
        if let Err(e) = self.db.rollback().await {
            log::warn!("Rollback failed (transaction may already be closed): {}", e);
        }
    }
}
