//! Run command implementation - executes pending migration scripts

use anyhow::Result;
use dw_runner::{MigrationRunner, ScriptStatus};

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::{load_project, open_database, ExitCode};

/// Execute the run command
pub(crate) async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let scripts = project.ordered_scripts()?;
    let (db, ledger) = open_database(&project).await?;
    let mut runner = MigrationRunner::new(db, ledger, &project.config.shadow_schema);

    if args.dry_run {
        let planned = runner.plan(&scripts).await?;
        let pending: Vec<_> = planned.iter().filter(|p| !p.already_executed).collect();
        println!(
            "Dry run: {} of {} scripts would execute\n",
            pending.len(),
            planned.len()
        );
        for p in &pending {
            println!("  {} ({}/{})", p.script.tag, p.file.package, p.file.rel_path);
        }
        return Ok(());
    }

    println!("Running project: {}\n", project.config.name);

    let summary = runner.run(&scripts).await?;

    for result in &summary.results {
        match result.status {
            ScriptStatus::Executed => {
                if global.verbose {
                    println!(
                        "  \u{2713} {} ({}/{}) [{}ms]",
                        result.tag,
                        result.package,
                        result.rel_path,
                        (result.duration_secs * 1000.0) as u64
                    );
                } else {
                    println!("  \u{2713} {}", result.tag);
                }
            }
            ScriptStatus::Skipped => {
                println!("  - {} (already executed)", result.tag);
            }
            ScriptStatus::Failed => {
                println!(
                    "  \u{2717} {} ({}/{})",
                    result.tag, result.package, result.rel_path
                );
                if let Some(error) = &result.error {
                    println!("      {}", error);
                }
            }
        }
    }

    println!(
        "\nRun {}: {} executed, {} skipped, {} deferred",
        summary.run_id,
        summary.executed_count(),
        summary.skipped_count(),
        summary.deferred
    );

    if summary.failure().is_some() {
        println!("Deployment halted; fix the failing script and run again.");
        return Err(ExitCode(1).into());
    }
    Ok(())
}
