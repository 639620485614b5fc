//! Dependency arranger
//!
//! Orders tables so that every table comes after the tables its foreign keys
//! refer to. Foreign keys closing a reference cycle are suppressed instead of
//! failing the arrangement, to be applied by the caller in a later pass.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::schema::types::ForeignKey;

/// Creation order of a set of tables
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Arrangement {
    /// Table names, referenced tables first
    pub tables: Vec<String>,
    /// Foreign keys left out of the ordering, by referencing table
    pub suppressed: IndexMap<String, Vec<ForeignKey>>,
}

impl Arrangement {
    /// Foreign keys suppressed for a table
    pub fn suppressed_for(&self, table: &str) -> &[ForeignKey] {
        self.suppressed.get(table).map_or(&[], Vec::as_slice)
    }
}

/// Topological sorter over foreign key references
#[derive(Debug, Clone, Default)]
pub struct Arranger {
    references: IndexMap<String, Vec<ForeignKey>>,
}

impl Arranger {
    /// Create an empty arranger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arranger from a table -> outgoing foreign keys map
    pub fn from_references(references: IndexMap<String, Vec<ForeignKey>>) -> Self {
        Self { references }
    }

    /// Register a table with its outgoing foreign keys
    pub fn add_table(&mut self, table: &str, foreign_keys: Vec<ForeignKey>) {
        self.references.insert(table.to_string(), foreign_keys);
    }

    /// Arrange the registered tables
    ///
    /// Tables are visited in registration order; references to tables that
    /// were not registered are ignored.
    pub fn arrange(&self) -> Arrangement {
        let mut state = Traversal::default();

        for table in self.references.keys() {
            self.visit(table, &mut state);
        }

        tracing::debug!(
            order = ?state.arrangement.tables,
            suppressed = state.arrangement.suppressed.len(),
            "Arranged tables"
        );

        state.arrangement
    }

    fn visit<'a>(&'a self, table: &'a str, state: &mut Traversal<'a>) {
        if state.visited.contains(table) || state.in_progress.contains(table) {
            return;
        }

        state.in_progress.insert(table);

        for foreign_key in self.references.get(table).into_iter().flatten() {
            let referred = foreign_key.referred_table.as_str();

            if !self.references.contains_key(referred) {
                tracing::warn!(
                    table,
                    foreign_key = %foreign_key.name,
                    referred_table = referred,
                    "Foreign key refers to a table outside the arranged set"
                );
                continue;
            }

            if state.in_progress.contains(referred) {
                tracing::debug!(table, foreign_key = %foreign_key.name, "Suppressed cyclic foreign key");
                state
                    .arrangement
                    .suppressed
                    .entry(table.to_string())
                    .or_default()
                    .push(foreign_key.clone());
                continue;
            }

            self.visit(referred, state);
        }

        state.in_progress.shift_remove(table);
        state.visited.insert(table);
        state.arrangement.tables.push(table.to_string());
    }
}

#[derive(Default)]
struct Traversal<'a> {
    visited: IndexSet<&'a str>,
    in_progress: IndexSet<&'a str>,
    arrangement: Arrangement,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fk(name: &str, referred_table: &str) -> ForeignKey {
        ForeignKey::new(name, &["ref_id"], referred_table, &["id"])
    }

    #[test]
    fn self_reference_is_suppressed() {
        let mut arranger = Arranger::new();
        arranger.add_table("category", vec![fk("fk_parent", "category")]);

        let arrangement = arranger.arrange();
        assert_eq!(arrangement.tables, vec!["category".to_string()]);
        assert_eq!(arrangement.suppressed_for("category")[0].name, "fk_parent");
    }

    #[test]
    fn unknown_references_are_ignored() {
        let mut arranger = Arranger::new();
        arranger.add_table("post", vec![fk("fk_user", "user")]);
        arranger.add_table("comment", vec![fk("fk_post", "post")]);

        let arrangement = arranger.arrange();
        assert_eq!(arrangement.tables, vec!["post".to_string(), "comment".to_string()]);
        assert!(arrangement.suppressed.is_empty());
        assert!(arrangement.suppressed_for("post").is_empty());
    }
}
