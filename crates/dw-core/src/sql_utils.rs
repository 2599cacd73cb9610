//! SQL identifier quoting utilities
//!
//! All SQL the engine emits is assembled from schema, table, and column names
//! that originate in script directives and catalog rows. These helpers quote
//! and escape every interpolated piece so a hostile name cannot break out of
//! its position in a statement.

/// Quote a SQL identifier to prevent injection.
///
/// Wraps the identifier in double quotes and escapes any embedded double
/// quotes by doubling them, following the SQL standard.
///
/// # Examples
/// ```
/// use dw_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("customer"), r#""customer""#);
/// assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a schema-qualified table reference.
///
/// # Examples
/// ```
/// use dw_core::sql_utils::qualify;
/// assert_eq!(qualify("dw_shadow", "crm__contact"), r#""dw_shadow"."crm__contact""#);
/// ```
pub fn qualify(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// The unqualified shadow table name for a (module, entity) pair.
///
/// Module and entity are joined with a double underscore; the pair is unique
/// because module and entity names themselves come from validated directive
/// parts that cannot contain the separator's surrounding context.
pub fn shadow_table_name(module: &str, entity: &str) -> String {
    format!("{}__{}", module, entity)
}

/// Escape a SQL string literal value by doubling single quotes.
///
/// For use inside single-quoted SQL string literals, not identifiers.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}
