//! Init command implementation - scaffolds a new Driftway project

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::cli::InitArgs;

/// Execute the init command
pub(crate) async fn execute(args: &InitArgs) -> Result<()> {
    // Reject names that could cause path traversal or confusing directory names
    if args.name.contains('/')
        || args.name.contains('\\')
        || args.name.contains("..")
        || args.name.starts_with('.')
        || args.name.starts_with('-')
    {
        anyhow::bail!(
            "Invalid project name '{}': must not contain '/', '\\', '..', or start with '.' or '-'",
            args.name
        );
    }

    let project_dir = Path::new(&args.name);

    if project_dir.exists() {
        anyhow::bail!(
            "Directory '{}' already exists. Choose a different project name.",
            args.name
        );
    }

    println!("Creating new Driftway project: {}\n", args.name);

    let dirs = ["", "packages", "packages/app", "packages/app/1.0", "target"];
    for dir in &dirs {
        let path = project_dir.join(dir);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }

    // Generate driftway.yml
    // Escape YAML special characters in interpolated values
    let safe_name = args.name.replace('"', "\\\"");
    let safe_db_path = args.database_path.replace('"', "\\\"");
    let config_content = format!(
        r#"name: "{name}"
version: "1.0"

package_paths: ["packages"]

database:
  type: duckdb
  path: "{db_path}"

# shadow_schema: dw_shadow
# meta_schema: dw_meta

# targets:
#   prod:
#     database:
#       path: /srv/app/prod.duckdb
"#,
        name = safe_name,
        db_path = safe_db_path,
    );
    fs::write(project_dir.join("driftway.yml"), config_content)
        .context("Failed to write driftway.yml")?;

    // Generate example package manifest
    let package_yml = r#"name: app
depends_on: []
"#;
    fs::write(project_dir.join("packages/app/package.yml"), package_yml)
        .context("Failed to write package.yml")?;

    // Generate example migration script
    let example_sql = r#"-- driftway:tag app-0001-example
-- driftway:use app.example key id integer
-- driftway:use app.example name text
-- driftway:run
-- Edit the shadow table here; the original stays untouched until apply.
UPDATE dw_shadow.app__example SET name = trim(name);
-- driftway:apply app.example (id, name)
"#;
    fs::write(
        project_dir.join("packages/app/1.0/1 - example.sql"),
        example_sql,
    )
    .context("Failed to write example script")?;

    println!("  Created driftway.yml");
    println!("  Created packages/app/package.yml");
    println!("  Created packages/app/1.0/1 - example.sql");
    println!("\nNext steps:");
    println!("  cd {}", args.name);
    println!("  dw validate");
    println!("  dw run");

    Ok(())
}
