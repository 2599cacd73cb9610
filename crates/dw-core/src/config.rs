//! Configuration types and parsing for driftway.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "driftway.yml";

/// Main project configuration from driftway.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Deployment project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Directories containing one subdirectory per package
    #[serde(default = "default_package_paths")]
    pub package_paths: Vec<String>,

    /// Target database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Schema holding shadow tables and the shadow catalog.
    ///
    /// The schema name doubles as the reserved prefix identifying purgeable
    /// objects for the out-of-band cleanup utility.
    #[serde(default = "default_shadow_schema")]
    pub shadow_schema: String,

    /// Schema holding the execution ledger and its version table
    #[serde(default = "default_meta_schema")]
    pub meta_schema: String,

    /// Named target configurations (e.g., dev, staging, prod).
    /// Each target can override the database connection and schema names.
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Shadow schema override
    #[serde(default)]
    pub shadow_schema: Option<String>,

    /// Meta schema override
    #[serde(default)]
    pub meta_schema: Option<String>,
}

/// Database type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// DuckDB (default)
    #[default]
    DuckDb,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database type
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Database path (file-based or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            path: default_db_path(),
        }
    }
}

impl Config {
    /// Load configuration from a project directory.
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE))
    }

    /// Load configuration from an explicit file path.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: format!("{}: {}", path.display(), e),
            })?;

        if config.name.is_empty() {
            return Err(CoreError::ConfigParseError {
                message: format!("{}: 'name' must not be empty", path.display()),
            });
        }

        Ok(config)
    }

    /// Resolve a named target into a concrete configuration.
    ///
    /// With `None` the base configuration is returned unchanged; otherwise
    /// the target's overrides are merged over the base.
    pub fn resolve_target(&self, target: Option<&str>) -> CoreResult<Config> {
        let Some(name) = target else {
            return Ok(self.clone());
        };

        let Some(overrides) = self.targets.get(name) else {
            let mut available: Vec<&str> = self.targets.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CoreError::UnknownTarget {
                target: name.to_string(),
                available: if available.is_empty() {
                    "<none>".to_string()
                } else {
                    available.join(", ")
                },
            });
        };

        let mut resolved = self.clone();
        if let Some(database) = &overrides.database {
            resolved.database = database.clone();
        }
        if let Some(shadow_schema) = &overrides.shadow_schema {
            resolved.shadow_schema = shadow_schema.clone();
        }
        if let Some(meta_schema) = &overrides.meta_schema {
            resolved.meta_schema = meta_schema.clone();
        }
        Ok(resolved)
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_package_paths() -> Vec<String> {
    vec!["packages".to_string()]
}

fn default_db_path() -> String {
    "target/driftway.duckdb".to_string()
}

fn default_shadow_schema() -> String {
    "dw_shadow".to_string()
}

fn default_meta_schema() -> String {
    "dw_meta".to_string()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
