//! History store interface
//!
//! A history store supplies, per table, the ordered list of structure changes
//! recorded by applied migrations.

use indexmap::IndexMap;
use std::fs;

use crate::error::{Error, Result};
use crate::history::change::{RawChange, StructureChange};

/// Source of recorded structure changes
pub trait HistoryStore {
    /// Changes recorded for a table, oldest first
    fn changes(&self, table: &str) -> Result<Vec<StructureChange>>;
}

/// History store holding its changes in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    changes: IndexMap<String, Vec<StructureChange>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change at the end of its table's history
    pub fn push(&mut self, change: StructureChange) {
        self.changes.entry(change.table.clone()).or_default().push(change);
    }

    /// Build a store from raw records, rejecting unknown method tags
    pub fn from_raw(records: Vec<RawChange>) -> Result<Self> {
        let mut history = Self::new();
        for record in records {
            history.push(StructureChange::from_raw(record)?);
        }
        Ok(history)
    }

    /// Load raw records from a JSON array
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<RawChange> = serde_json::from_str(json)
            .map_err(|e| Error::HistoryError(format!("Failed to parse history: {}", e)))?;
        Self::from_raw(records)
    }

    /// Load raw records from a JSON file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| Error::HistoryError(format!("Failed to read history file: {}", e)))?;
        Self::from_json_str(&json)
    }

    /// Tables with at least one recorded change
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }
}

impl HistoryStore for MemoryHistory {
    fn changes(&self, table: &str) -> Result<Vec<StructureChange>> {
        Ok(self.changes.get(table).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::change::ChangeMethod;

    #[test]
    fn keeps_changes_per_table_in_order() {
        let history = MemoryHistory::from_json_str(
            r#"[
                {"table": "post", "method": "createTable", "data": {"columns": {}}},
                {"table": "user", "method": "createTable", "data": {"columns": {}}},
                {"table": "post", "method": "dropColumn", "data": "title"}
            ]"#,
        )
        .unwrap();

        let post = history.changes("post").unwrap();
        assert_eq!(post.len(), 2);
        assert_eq!(post[1].method, ChangeMethod::DropColumn);
        assert!(history.changes("missing").unwrap().is_empty());
        assert_eq!(history.tables().collect::<Vec<_>>(), vec!["post", "user"]);
    }

    #[test]
    fn invalid_json_is_a_history_error() {
        assert!(matches!(
            MemoryHistory::from_json_str("{"),
            Err(Error::HistoryError(_))
        ));
    }
}
