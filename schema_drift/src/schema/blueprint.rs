//! Blueprint of the changes needed to bring a declared structure in line
//! with the live table

use indexmap::IndexMap;
use serde::Serialize;

use crate::schema::column::Column;
use crate::schema::types::{ForeignKey, Index, PrimaryKey};

/// Categorized result of a single comparison
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Blueprint {
    pub table_name: String,
    added_columns: IndexMap<String, Column>,
    dropped_columns: IndexMap<String, Column>,
    altered_columns: IndexMap<String, Column>,
    unaltered_columns: IndexMap<String, Column>,
    added_foreign_keys: IndexMap<String, ForeignKey>,
    dropped_foreign_keys: IndexMap<String, ForeignKey>,
    added_indexes: IndexMap<String, Index>,
    dropped_indexes: IndexMap<String, Index>,
    added_primary_key: Option<PrimaryKey>,
    dropped_primary_key: Option<PrimaryKey>,
    descriptions: Vec<String>,
    start_from_scratch: bool,
}

impl Blueprint {
    /// Create a new empty blueprint for a table
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            ..Self::default()
        }
    }

    pub fn add_description(&mut self, description: impl Into<String>) {
        let description = description.into();
        tracing::debug!(table = %self.table_name, %description, "Structure difference");
        self.descriptions.push(description);
    }

    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }

    pub fn add_column(&mut self, column: Column) {
        self.added_columns.insert(column.name.clone(), column);
    }

    pub fn drop_column(&mut self, column: Column) {
        self.dropped_columns.insert(column.name.clone(), column);
    }

    /// Record a column alteration with the live version of the column
    pub fn alter_column(&mut self, column: Column) {
        self.altered_columns.insert(column.name.clone(), column);
    }

    /// Record the declared version of an altered column
    pub fn unalter_column(&mut self, column: Column) {
        self.unaltered_columns.insert(column.name.clone(), column);
    }

    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) {
        self.added_foreign_keys.insert(foreign_key.name.clone(), foreign_key);
    }

    pub fn drop_foreign_key(&mut self, foreign_key: ForeignKey) {
        self.dropped_foreign_keys.insert(foreign_key.name.clone(), foreign_key);
    }

    pub fn add_index(&mut self, index: Index) {
        self.added_indexes.insert(index.name.clone(), index);
    }

    pub fn drop_index(&mut self, index: Index) {
        self.dropped_indexes.insert(index.name.clone(), index);
    }

    pub fn add_primary_key(&mut self, primary_key: PrimaryKey) {
        self.added_primary_key = Some(primary_key);
    }

    pub fn drop_primary_key(&mut self, primary_key: PrimaryKey) {
        self.dropped_primary_key = Some(primary_key);
    }

    /// Mark that the declared structure has nothing to start from
    pub fn start_from_scratch(&mut self) {
        self.start_from_scratch = true;
    }

    pub fn needs_start_from_scratch(&self) -> bool {
        self.start_from_scratch
    }

    pub fn added_columns(&self) -> &IndexMap<String, Column> {
        &self.added_columns
    }

    pub fn dropped_columns(&self) -> &IndexMap<String, Column> {
        &self.dropped_columns
    }

    pub fn altered_columns(&self) -> &IndexMap<String, Column> {
        &self.altered_columns
    }

    pub fn unaltered_columns(&self) -> &IndexMap<String, Column> {
        &self.unaltered_columns
    }

    pub fn added_foreign_keys(&self) -> &IndexMap<String, ForeignKey> {
        &self.added_foreign_keys
    }

    pub fn dropped_foreign_keys(&self) -> &IndexMap<String, ForeignKey> {
        &self.dropped_foreign_keys
    }

    pub fn added_indexes(&self) -> &IndexMap<String, Index> {
        &self.added_indexes
    }

    pub fn dropped_indexes(&self) -> &IndexMap<String, Index> {
        &self.dropped_indexes
    }

    pub fn added_primary_key(&self) -> Option<&PrimaryKey> {
        self.added_primary_key.as_ref()
    }

    pub fn dropped_primary_key(&self) -> Option<&PrimaryKey> {
        self.dropped_primary_key.as_ref()
    }

    /// Check whether any change bucket received an entry
    pub fn is_pending(&self) -> bool {
        !self.added_columns.is_empty()
            || !self.dropped_columns.is_empty()
            || !self.altered_columns.is_empty()
            || !self.added_foreign_keys.is_empty()
            || !self.dropped_foreign_keys.is_empty()
            || !self.added_indexes.is_empty()
            || !self.dropped_indexes.is_empty()
            || self.added_primary_key.is_some()
            || self.dropped_primary_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::column::ColumnType;
    use crate::schema::dialect::Dialect;

    #[test]
    fn empty_blueprint_is_not_pending() {
        let blueprint = Blueprint::new("post");
        assert!(!blueprint.is_pending());
        assert!(blueprint.descriptions().is_empty());
    }

    #[test]
    fn any_bucket_makes_blueprint_pending() {
        let mut blueprint = Blueprint::new("post");
        blueprint.drop_index(Index::new("idx", &["a"], false));
        assert!(blueprint.is_pending());

        let mut blueprint = Blueprint::new("post");
        blueprint.add_column(Column::new("a", ColumnType::Integer, Dialect::MySql));
        assert!(blueprint.is_pending());
        assert!(blueprint.added_columns().contains_key("a"));
    }

    #[test]
    fn primary_key_buckets_make_blueprint_pending() {
        let mut blueprint = Blueprint::new("post");
        blueprint.add_description("different primary key definition");
        blueprint.drop_primary_key(PrimaryKey::new(None, &["id".to_string()]));

        assert!(blueprint.is_pending());
        assert_eq!(blueprint.dropped_primary_key().unwrap().columns(), &["id".to_string()]);
        assert!(blueprint.added_primary_key().is_none());
    }
}
