//! Script execution session.
//!
//! A session is what a script body runs against: the typed shadow
//! operations (`use`, `apply`) plus raw statement batches, all on the one
//! shared connection. The orchestrator owns the surrounding transaction;
//! the session never begins or commits anything itself.

use crate::error::StepError;
use dw_db::Database;
use dw_script::{ApplyDecl, ParsedScript, UseDecl};
use dw_shadow::{ApplyEngine, ShadowSchemaManager};

/// Execution surface handed to each script.
pub struct ScriptSession<'a> {
    db: &'a dyn Database,
    shadow: &'a mut ShadowSchemaManager,
    apply: &'a ApplyEngine,
}

impl<'a> ScriptSession<'a> {
    /// Create a session over the shared database handle.
    pub fn new(
        db: &'a dyn Database,
        shadow: &'a mut ShadowSchemaManager,
        apply: &'a ApplyEngine,
    ) -> Self {
        Self { db, shadow, apply }
    }

    /// Execute a `use` declaration.
    pub async fn use_column(&mut self, decl: &UseDecl) -> Result<(), StepError> {
        self.shadow
            .use_column(&decl.module, &decl.entity, &decl.column, decl.ty, decl.key)
            .await?;
        Ok(())
    }

    /// Execute one raw SQL batch.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), StepError> {
        self.db.execute_batch(sql).await?;
        Ok(())
    }

    /// Execute an `apply` declaration.
    pub async fn apply(&self, decl: &ApplyDecl) -> Result<(), StepError> {
        self.apply
            .apply(&decl.module, &decl.entity, &decl.columns)
            .await?;
        Ok(())
    }

    /// Run a parsed script's body in its declared order: `use` declarations,
    /// then statement batches, then `apply` calls.
    pub async fn run(&mut self, script: &ParsedScript) -> Result<(), StepError> {
        for decl in &script.uses {
            self.use_column(decl).await?;
        }
        for batch in &script.batches {
            self.execute_batch(batch).await?;
        }
        for decl in &script.applies {
            self.apply(decl).await?;
        }
        Ok(())
    }
}
