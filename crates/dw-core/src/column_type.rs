//! Logical column types and the conversion-compatibility table.
//!
//! Scripts declare shadow columns with a logical type from this closed set.
//! Before any copy between an original column and a shadow column, the
//! declared type is checked against the existing type through
//! [`ColumnType::convertible_to`]; unsupported pairs fail the script rather
//! than producing a lossy cast at runtime.

use serde::{Deserialize, Serialize};

/// Closed set of logical column types supported by the shadow protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Boolean flag
    Boolean,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    BigInt,
    /// Double-precision float
    Double,
    /// Variable-length text
    Text,
    /// Calendar date
    Date,
    /// Date and time
    Timestamp,
    /// Raw bytes
    Blob,
}

impl ColumnType {
    /// Parse a declared type name as written in a script's `use` directive.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Some(Self::Boolean),
            "integer" | "int" => Some(Self::Integer),
            "bigint" => Some(Self::BigInt),
            "double" | "float" => Some(Self::Double),
            "text" | "varchar" | "string" => Some(Self::Text),
            "date" => Some(Self::Date),
            "timestamp" | "datetime" => Some(Self::Timestamp),
            "blob" | "bytea" => Some(Self::Blob),
            _ => None,
        }
    }

    /// Map a `data_type` value from `information_schema.columns` to a
    /// logical type. Returns `None` for types the protocol does not cover.
    pub fn from_sql_type(data_type: &str) -> Option<Self> {
        let upper = data_type.to_ascii_uppercase();
        match upper.as_str() {
            "BOOLEAN" => return Some(Self::Boolean),
            "TINYINT" | "SMALLINT" | "INTEGER" | "INT" | "INT4" => return Some(Self::Integer),
            "BIGINT" | "INT8" | "HUGEINT" => return Some(Self::BigInt),
            "REAL" | "FLOAT" | "DOUBLE" | "FLOAT8" => return Some(Self::Double),
            "DATE" => return Some(Self::Date),
            "BLOB" | "BYTEA" => return Some(Self::Blob),
            _ => {}
        }
        // Parameterized types report with their arguments, e.g. VARCHAR(40),
        // DECIMAL(18,3), TIMESTAMP WITH TIME ZONE.
        if upper.starts_with("VARCHAR") || upper.starts_with("CHAR") || upper == "TEXT" {
            Some(Self::Text)
        } else if upper.starts_with("DECIMAL") || upper.starts_with("NUMERIC") {
            Some(Self::Double)
        } else if upper.starts_with("TIMESTAMP") || upper.starts_with("DATETIME") {
            Some(Self::Timestamp)
        } else {
            None
        }
    }

    /// The SQL type name used when creating or altering shadow columns.
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Double => "DOUBLE",
            Self::Text => "VARCHAR",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::Blob => "BLOB",
        }
    }

    /// Whether a value of `self` may be copied into a column of `target`.
    ///
    /// This is the explicit compatibility table behind every `CAST` the
    /// engine emits. Identity is always allowed; the remaining entries are
    /// the conversions the database performs without data corruption. Text
    /// never converts *to* a non-text type (parsing casts fail row by row at
    /// runtime, which the protocol cannot tolerate mid-deployment).
    pub fn convertible_to(self, target: ColumnType) -> bool {
        use ColumnType::*;
        if self == target {
            return true;
        }
        matches!(
            (self, target),
            (Boolean, Integer)
                | (Boolean, BigInt)
                | (Boolean, Text)
                | (Integer, BigInt)
                | (Integer, Double)
                | (Integer, Text)
                | (BigInt, Integer)
                | (BigInt, Double)
                | (BigInt, Text)
                | (Double, Text)
                | (Date, Timestamp)
                | (Date, Text)
                | (Timestamp, Date)
                | (Timestamp, Text)
        )
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::Integer => write!(f, "integer"),
            Self::BigInt => write!(f, "bigint"),
            Self::Double => write!(f, "double"),
            Self::Text => write!(f, "text"),
            Self::Date => write!(f, "date"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Blob => write!(f, "blob"),
        }
    }
}
