//! Error types for dw-core

use thiserror::Error;

/// Core error type for Driftway
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Unknown target name
    #[error("[E003] Unknown target '{target}' (defined targets: {available})")]
    UnknownTarget { target: String, available: String },

    /// E004: Project directory not found
    #[error("[E004] Project directory not found: {path}")]
    ProjectNotFound { path: String },

    /// E005: Package manifest names a dependency that is not a known package
    #[error("[E005] Package '{package}' depends on unknown package '{depends_on}'")]
    UnknownDependency { package: String, depends_on: String },

    /// E006: Two package directories resolve to the same package name
    #[error("[E006] Duplicate package name '{name}' in {path1} and {path2}")]
    DuplicatePackage {
        name: String,
        path1: String,
        path2: String,
    },

    /// E007: Circular package dependency
    #[error("[E007] Dependency cycle detected: {cycle}")]
    DependencyCycle { cycle: String },

    /// E008: Empty or otherwise invalid name
    #[error("[E008] Invalid name in {context}: {reason}")]
    InvalidName { context: String, reason: String },

    /// E009: IO error
    #[error("[E009] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E010: IO error with file path context
    #[error("[E010] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E011: YAML parse error
    #[error("[E011] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
