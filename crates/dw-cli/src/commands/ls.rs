//! Ls command implementation - lists scripts and their ledger status

use anyhow::Result;
use dw_runner::MigrationRunner;
use serde_json::json;

use crate::cli::{GlobalArgs, LsArgs, LsOutput};
use crate::commands::common::{load_project, open_database};

/// Execute the ls command
pub(crate) async fn execute(args: &LsArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let scripts = project.ordered_scripts()?;
    let (db, ledger) = open_database(&project).await?;
    let runner = MigrationRunner::new(db, ledger, &project.config.shadow_schema);
    let planned = runner.plan(&scripts).await?;

    match args.output {
        LsOutput::Json => {
            let entries: Vec<_> = planned
                .iter()
                .map(|p| {
                    json!({
                        "tag": p.script.tag.as_str(),
                        "package": p.file.package.as_str(),
                        "path": p.file.rel_path,
                        "executed": p.already_executed,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        LsOutput::Table => {
            if planned.is_empty() {
                println!("No scripts discovered.");
                return Ok(());
            }
            println!("{:<10} {:<16} {:<40} TAG", "STATUS", "PACKAGE", "PATH");
            for p in &planned {
                let status = if p.already_executed { "executed" } else { "pending" };
                println!(
                    "{:<10} {:<16} {:<40} {}",
                    status,
                    p.file.package.as_str(),
                    p.file.rel_path,
                    p.script.tag
                );
            }
            let pending = planned.iter().filter(|p| !p.already_executed).count();
            println!("\n{} scripts, {} pending", planned.len(), pending);
        }
    }

    Ok(())
}
