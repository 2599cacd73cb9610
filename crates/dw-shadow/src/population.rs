//! Run-scoped population tracking.
//!
//! A shadow column is copied from its original source at most once per
//! deployment run. This record is what makes a second `use` of the same
//! column a no-op, so a later script observes the edits an earlier script
//! made to the shared shadow data instead of a fresh copy of the original.
//! The record lives only for one orchestrator run and is discarded after.

use std::collections::HashSet;

/// Tracks which (shadow table, column) pairs were populated this run.
#[derive(Debug, Default)]
pub struct PopulationRecord {
    populated: HashSet<(String, String)>,
}

impl PopulationRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a pair populated. Returns `true` if it was not already marked.
    pub fn mark(&mut self, table: &str, column: &str) -> bool {
        self.populated
            .insert((table.to_string(), column.to_string()))
    }

    /// Whether a pair has been populated this run.
    pub fn is_populated(&self, table: &str, column: &str) -> bool {
        self.populated
            .contains(&(table.to_string(), column.to_string()))
    }

    /// Forget everything; called at the start of a new run.
    pub fn clear(&mut self) {
        self.populated.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_query() {
        let mut record = PopulationRecord::new();
        assert!(!record.is_populated("crm__contact", "email"));
        assert!(record.mark("crm__contact", "email"));
        assert!(record.is_populated("crm__contact", "email"));
        assert!(!record.is_populated("crm__contact", "id"));
    }

    #[test]
    fn test_second_mark_reports_already_populated() {
        let mut record = PopulationRecord::new();
        assert!(record.mark("t", "c"));
        assert!(!record.mark("t", "c"));
    }

    #[test]
    fn test_clear_resets_for_a_new_run() {
        let mut record = PopulationRecord::new();
        record.mark("t", "c");
        record.clear();
        assert!(!record.is_populated("t", "c"));
        assert!(record.mark("t", "c"));
    }
}
