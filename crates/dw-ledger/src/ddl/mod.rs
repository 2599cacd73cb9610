//! Embedded DDL migrations for the ledger's meta schema.
//!
//! Each migration is a numbered `.sql` file embedded via `include_str!`,
//! written against the `{meta_schema}` placeholder so deployments can host
//! the ledger in a schema of their choosing. The [`MIGRATIONS`] array is
//! ordered by version number and consumed by
//! [`crate::migration::run_migrations`].

/// A single DDL migration.
pub struct Migration {
    /// Sequential version number (1-based).
    pub version: i32,
    /// Raw SQL with `{meta_schema}` placeholders.
    pub sql: &'static str,
}

impl Migration {
    /// Render the migration SQL against a concrete meta schema name.
    pub fn render(&self, meta_schema: &str) -> String {
        self.sql.replace("{meta_schema}", meta_schema)
    }
}

/// All known migrations, in order.
pub static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("v001_initial.sql"),
}];
