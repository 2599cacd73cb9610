//! Error types for dw-script

use thiserror::Error;

/// Script parsing errors
#[derive(Error, Debug)]
pub enum ScriptError {
    /// P001: No tag marker found
    #[error("[P001] Script has no tag marker; the first directive must be '-- driftway:tag <value>'")]
    MissingTag,

    /// P002: More than one tag marker
    #[error("[P002] Duplicate tag directive on line {line}")]
    DuplicateTag { line: usize },

    /// P003: Tag value is not a valid tag
    #[error("[P003] Invalid tag '{value}' on line {line}: tags must be non-empty and free of whitespace")]
    InvalidTag { value: String, line: usize },

    /// P004: Directive could not be parsed
    #[error("[P004] Malformed directive on line {line}: {message}")]
    MalformedDirective { line: usize, message: String },

    /// P005: Directive appears in the wrong section of the script
    #[error("[P005] Directive '{directive}' on line {line} is out of order: {message}")]
    DirectiveOutOfOrder {
        directive: String,
        line: usize,
        message: String,
    },

    /// P006: Declared column type is not a supported logical type
    #[error("[P006] Unknown column type '{value}' on line {line}")]
    UnknownColumnType { value: String, line: usize },

    /// P007: Apply directive has an empty column list
    #[error("[P007] Empty column list in apply directive on line {line}")]
    EmptyColumnList { line: usize },
}

/// Result type alias for ScriptError
pub type ScriptResult<T> = Result<T, ScriptError>;
