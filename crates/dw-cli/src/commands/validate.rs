//! Validate command implementation - parses scripts without a database

use anyhow::Result;
use dw_core::ScriptTag;
use dw_script::parse_script;
use std::collections::HashMap;

use crate::cli::{GlobalArgs, ValidateArgs};
use crate::commands::common::{load_project, ExitCode};

/// Execute the validate command
pub(crate) async fn execute(_args: &ValidateArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let scripts = project.ordered_scripts()?;

    let mut seen: HashMap<ScriptTag, String> = HashMap::new();
    let mut errors = 0;

    for file in &scripts {
        let location = format!("{}/{}", file.package, file.rel_path);
        match parse_script(&file.source) {
            Ok(script) => {
                if let Some(first) = seen.insert(script.tag.clone(), location.clone()) {
                    println!(
                        "  \u{2717} {} - duplicate tag '{}' (first used by {})",
                        location, script.tag, first
                    );
                    errors += 1;
                } else if global.verbose {
                    println!(
                        "  \u{2713} {} ({} use, {} batch, {} apply)",
                        location,
                        script.uses.len(),
                        script.batches.len(),
                        script.applies.len()
                    );
                } else {
                    println!("  \u{2713} {}", location);
                }
            }
            Err(e) => {
                println!("  \u{2717} {} - {}", location, e);
                errors += 1;
            }
        }
    }

    println!();
    if errors > 0 {
        println!("{} of {} scripts invalid", errors, scripts.len());
        return Err(ExitCode(1).into());
    }
    println!("{} scripts valid", scripts.len());
    Ok(())
}
